#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Creates a temporary route table with a unique name
    pub fn create_temp_table(content: &str, ext: &str) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();

        let path = std::env::temp_dir().join(format!(
            "brrtd_test_{}_{}_{}.{}",
            std::process::id(),
            counter,
            nanos,
            ext
        ));

        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn create_temp_yaml(content: &str) -> PathBuf {
        create_temp_table(content, "yaml")
    }

    /// Cleanup temporary files (best effort)
    pub fn cleanup_temp_files(paths: &[PathBuf]) {
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

pub mod test_tracing {
    use tracing::subscriber::DefaultGuard;

    /// Routes `tracing` output of the current test thread through the test writer.
    pub struct TestTracing {
        _guard: DefaultGuard,
    }

    impl TestTracing {
        pub fn init() -> Self {
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_test_writer()
                .finish();
            Self {
                _guard: tracing::subscriber::set_default(subscriber),
            }
        }
    }
}

pub mod controllers {
    use brrtdispatch::{ActionTable, Application, ConfigError, Context, Controller};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    pub type Journal = Arc<Mutex<Vec<String>>>;

    /// Drain the journal.
    pub fn take(journal: &Journal) -> Vec<String> {
        std::mem::take(&mut *journal.lock().unwrap())
    }

    /// Controller whose actions and hooks append to a shared journal.
    ///
    /// Every action responds with `{"action": "<name>", "args": [...], "captures": [...]}`.
    pub struct Scripted {
        pub name: &'static str,
        pub namespace: Option<&'static str>,
        pub actions: Vec<(&'static str, &'static str)>,
        pub journal: Journal,
        pub deny: bool,
        pub refuse_pre_fork: bool,
        pub refuse_post_fork: bool,
    }

    impl Scripted {
        pub fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                namespace: None,
                actions: Vec::new(),
                journal: Arc::clone(journal),
                deny: false,
                refuse_pre_fork: false,
                refuse_post_fork: false,
            }
        }

        pub fn namespace(mut self, namespace: &'static str) -> Self {
            self.namespace = Some(namespace);
            self
        }

        pub fn action(mut self, name: &'static str, attributes: &'static str) -> Self {
            self.actions.push((name, attributes));
            self
        }

        fn record(&self, entry: String) {
            self.journal.lock().unwrap().push(entry);
        }
    }

    impl Controller for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn namespace(&self) -> Option<&str> {
            self.namespace
        }

        fn actions(&self, table: &mut ActionTable) -> Result<(), ConfigError> {
            for &(name, attributes) in &self.actions {
                let journal = Arc::clone(&self.journal);
                table
                    .action(name, move |ctx: &mut Context, args: &[String]| {
                        journal
                            .lock()
                            .unwrap()
                            .push(format!("{name}({})", args.join(",")));
                        let captures = ctx.captures();
                        ctx.response_mut().set_json(
                            200,
                            json!({ "action": name, "args": args, "captures": captures }),
                        );
                        Ok(())
                    })
                    .attrs(attributes)?;
            }
            Ok(())
        }

        fn begin(&self, _ctx: &mut Context) {
            self.record(format!("begin:{}", self.name));
        }

        fn auto(&self, _ctx: &mut Context) -> bool {
            self.record(format!("auto:{}", self.name));
            !self.deny
        }

        fn end(&self, _ctx: &mut Context) {
            self.record(format!("end:{}", self.name));
        }

        fn pre_fork(&self, _app: &Application) -> bool {
            self.record(format!("pre_fork:{}", self.name));
            !self.refuse_pre_fork
        }

        fn post_fork(&self, _app: &Application) -> bool {
            self.record(format!("post_fork:{}", self.name));
            !self.refuse_post_fork
        }
    }
}
