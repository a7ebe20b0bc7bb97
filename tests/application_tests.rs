//! Application lifecycle: fork hooks, workers sharing one dispatcher, and
//! custom dispatch types plugged in through the builder.

use brrtdispatch::{
    Action, ActionId, ActionMatch, Application, ConfigError, DispatchOutcome, DispatchType,
    PathDispatchType, Request, RouteListing, StartupError,
};
use http::Method;
use regex::Regex;

mod common;
use common::controllers::{take, Journal, Scripted};

#[test]
fn test_pre_fork_runs_once_per_controller() {
    let journal = Journal::default();
    let _app = Application::builder("hooks")
        .controller(Scripted::new("Root", &journal).action("index", ":Path('')"))
        .controller(Scripted::new("Foo", &journal).action("bar", ":Local"))
        .build()
        .unwrap();

    assert_eq!(take(&journal), vec!["pre_fork:Root", "pre_fork:Foo"]);
}

#[test]
fn test_pre_fork_rejection_aborts_startup() {
    let journal = Journal::default();
    let mut foo = Scripted::new("Foo", &journal).action("bar", ":Local");
    foo.refuse_pre_fork = true;

    let err = Application::builder("hooks").controller(foo).build().unwrap_err();
    assert!(matches!(err, StartupError::PreFork { ref controller } if controller == "Foo"));
}

#[test]
fn test_workers_share_dispatcher() {
    let journal = Journal::default();
    let app = Application::builder("workers")
        .controller(Scripted::new("Foo", &journal).action("bar", ":Path('baz') :Args(1)"))
        .build()
        .unwrap();
    take(&journal);

    let results = app
        .run_workers(4, |worker| {
            (0..25)
                .map(|i| {
                    let (outcome, response) =
                        worker.handle(Request::new(Method::GET, format!("/foo/baz/{i}")));
                    assert_eq!(outcome, DispatchOutcome::Handled);
                    response.body["args"][0].as_str().unwrap().parse::<u32>().unwrap()
                })
                .sum::<u32>()
        })
        .unwrap();

    assert_eq!(results, vec![300; 4]);
    let entries = take(&journal);
    assert_eq!(entries.iter().filter(|e| e.starts_with("post_fork:")).count(), 4);
    assert_eq!(entries.iter().filter(|e| e.starts_with("bar(")).count(), 100);
}

#[test]
fn test_post_fork_rejection_fails_worker() {
    let journal = Journal::default();
    let mut foo = Scripted::new("Foo", &journal).action("bar", ":Local");
    foo.refuse_post_fork = true;
    let app = Application::builder("hooks").controller(foo).build().unwrap();

    let err = app.worker(3).unwrap_err();
    assert!(matches!(err, StartupError::PostFork { worker: 3, .. }));
    assert!(app.run_workers(2, |_| ()).is_err());
}

#[test]
fn test_worker_panic_is_reported() {
    let journal = Journal::default();
    let app = Application::builder("panics")
        .controller(Scripted::new("Foo", &journal).action("bar", ":Local"))
        .build()
        .unwrap();

    let err = app
        .run_workers(2, |worker| {
            if worker.id() == 1 {
                panic!("worker down");
            }
        })
        .unwrap_err();
    assert!(matches!(err, StartupError::WorkerPanicked { worker: 1 }));
}

/// Matches whole request paths against a `:Regex('...')` attribute.
/// Capture groups become the action arguments.
#[derive(Default)]
struct RegexDispatchType {
    patterns: Vec<(Regex, ActionId, String)>,
}

impl DispatchType for RegexDispatchType {
    fn name(&self) -> &'static str {
        "Regex"
    }

    fn register_action(&mut self, action: &Action) -> Result<bool, ConfigError> {
        let Some(pattern) = action.meta().extra.get("Regex") else {
            return Ok(false);
        };
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidAttribute {
            action: action.private_path().to_string(),
            key: "Regex".to_string(),
            value: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.patterns
            .push((regex, action.id(), action.private_path().to_string()));
        Ok(true)
    }

    fn resolve(&self, _method: &Method, path: &str) -> Option<ActionMatch> {
        self.patterns.iter().find_map(|(regex, id, _)| {
            let caps = regex.captures(path)?;
            Some(ActionMatch {
                action: *id,
                chain: Vec::new(),
                args: caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().to_string())
                    .collect(),
                matched_path: path.trim_start_matches('/').to_string(),
                dispatch_type: "Regex",
            })
        })
    }

    fn list(&self) -> Vec<RouteListing> {
        self.patterns
            .iter()
            .map(|(regex, _, private_path)| RouteListing {
                dispatch_type: "Regex",
                path: regex.as_str().to_string(),
                args: "*".to_string(),
                methods: "*".to_string(),
                action: private_path.clone(),
                chain: Vec::new(),
            })
            .collect()
    }

    fn uri_for_action(&self, _action: &Action, _captures: &[String]) -> Option<String> {
        None
    }
}

#[test]
fn test_custom_dispatch_type() {
    let journal = Journal::default();
    let app = Application::builder("custom")
        .controller(
            Scripted::new("Archive", &journal)
                .action("year", r":Regex('^/archive/(\d{4})$')")
                .action("index", ":Path('') :Args(0)"),
        )
        .dispatch_type(PathDispatchType::new())
        .dispatch_type(RegexDispatchType::default())
        .build()
        .unwrap();

    let (_, response) = app.handle(Request::new(Method::GET, "/archive/2024"));
    assert_eq!(response.body["action"], "year");
    assert_eq!(response.body["args"], serde_json::json!(["2024"]));

    let (_, response) = app.handle(Request::new(Method::GET, "/archive"));
    assert_eq!(response.body["action"], "index");

    assert_eq!(app.dispatcher().type_names(), vec!["Path", "Regex"]);
    assert!(app
        .dispatcher()
        .list()
        .iter()
        .any(|route| route.dispatch_type == "Regex" && route.action == "archive/year"));
}

#[test]
fn test_custom_types_replace_defaults() {
    let journal = Journal::default();
    let err = Application::builder("custom")
        .controller(Scripted::new("Archive", &journal).action("index", ":Path('') :Args(0)"))
        .dispatch_type(RegexDispatchType::default())
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        StartupError::Config(ConfigError::Unregistered { .. })
    ));
}
