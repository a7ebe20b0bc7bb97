//! End-to-end tests for `Chained` dispatch: chain walking, captures,
//! precedence against `Path`, and startup validation.

use brrtdispatch::{Application, ConfigError, DispatchOutcome, Request, StartupError};
use http::Method;

mod common;
use common::controllers::{take, Journal, Scripted};

fn users(journal: &Journal) -> Scripted {
    Scripted::new("Users", journal)
        .action("base", ":Chained('/') :PathPart('users') :CaptureArgs(1)")
        .action("view", ":Chained('base') :PathPart('view') :Args(0)")
        .action("edit", ":Chained('base') :PathPart('edit') :Method('POST') :Args(0)")
        .action("files", ":Chained('base') :PathPart('files') :Args()")
}

fn posts(journal: &Journal) -> Scripted {
    // Hangs off another controller's link by absolute private path.
    Scripted::new("Posts", journal)
        .action("by_user", ":Chained('/users/base') :PathPart('posts') :CaptureArgs(1)")
        .action("show", ":Chained('by_user') :PathPart('') :Args(0)")
}

#[test]
fn test_chain_runs_every_link_in_order() {
    let journal = Journal::default();
    let app = Application::builder("chains")
        .controller(Scripted::new("Root", &journal))
        .controller(users(&journal))
        .build()
        .unwrap();

    let (outcome, response) = app.handle(Request::new(Method::GET, "/users/42/view"));
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(response.body["action"], "view");
    assert_eq!(response.body["captures"], serde_json::json!(["42"]));
    assert_eq!(
        take(&journal),
        vec![
            "begin:Users",
            "auto:Root",
            "auto:Users",
            "base(42)",
            "view()",
            "end:Users",
            "end:Root",
        ]
    );
}

#[test]
fn test_chain_across_controllers() {
    let journal = Journal::default();
    let app = Application::builder("chains")
        .controller(users(&journal))
        .controller(posts(&journal))
        .build()
        .unwrap();

    let (outcome, response) = app.handle(Request::new(Method::GET, "/users/7/posts/99"));
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(response.body["action"], "show");
    assert_eq!(response.body["captures"], serde_json::json!(["7", "99"]));

    let entries = take(&journal);
    let actions: Vec<&str> = entries
        .iter()
        .map(String::as_str)
        .filter(|e| e.contains('('))
        .collect();
    assert_eq!(actions, vec!["base(7)", "by_user(99)", "show()"]);
    // Both controllers owning links see auto and end.
    assert!(entries.contains(&"auto:Users".to_string()));
    assert!(entries.contains(&"end:Users".to_string()));
    assert!(entries.contains(&"end:Posts".to_string()));
}

#[test]
fn test_endpoint_args_and_methods() {
    let journal = Journal::default();
    let app = Application::builder("chains")
        .controller(users(&journal))
        .build()
        .unwrap();

    let (_, response) = app.handle(Request::new(Method::GET, "/users/1/files/a/b%20c"));
    assert_eq!(response.body["action"], "files");
    assert_eq!(response.body["args"], serde_json::json!(["a", "b c"]));

    let (outcome, _) = app.handle(Request::new(Method::GET, "/users/1/edit"));
    assert_eq!(outcome, DispatchOutcome::NotFound);
    let (_, response) = app.handle(Request::new(Method::POST, "/users/1/edit"));
    assert_eq!(response.body["action"], "edit");

    // Midpoints alone never answer a request.
    let (outcome, _) = app.handle(Request::new(Method::GET, "/users/1"));
    assert_eq!(outcome, DispatchOutcome::NotFound);
}

#[test]
fn test_path_beats_low_precedence_chained() {
    let journal = Journal::default();
    let build = |low: bool| {
        Application::builder("precedence")
            .controller(users(&journal))
            .controller(Scripted::new("Root", &journal).action("catch", ":Path('users') :Args()"))
            .chained_low_precedence(low)
            .build()
            .unwrap()
    };

    let app = build(true);
    let (_, response) = app.handle(Request::new(Method::GET, "/users/42/view"));
    assert_eq!(response.body["action"], "catch");

    // At equal precedence types are tried by name, so Chained goes first.
    let app = build(false);
    let (_, response) = app.handle(Request::new(Method::GET, "/users/42/view"));
    assert_eq!(response.body["action"], "view");
}

#[test]
fn test_root_default_shadows_low_precedence_chains() {
    let journal = Journal::default();
    let build = |low: bool| {
        Application::builder("fallback")
            .controller(Scripted::new("Root", &journal).action("default", ":Path('')"))
            .controller(users(&journal))
            .chained_low_precedence(low)
            .build()
            .unwrap()
    };

    // Path falls back through every prefix down to the root before Chained runs.
    let app = build(true);
    let (_, response) = app.handle(Request::new(Method::GET, "/users/42/view"));
    assert_eq!(response.body["action"], "default");
    assert_eq!(response.body["args"], serde_json::json!(["users", "42", "view"]));

    let app = build(false);
    let (_, response) = app.handle(Request::new(Method::GET, "/users/42/view"));
    assert_eq!(response.body["action"], "view");
    let (_, response) = app.handle(Request::new(Method::GET, "/nothing/here"));
    assert_eq!(response.body["action"], "default");
}

#[test]
fn test_uri_for_chain_endpoint() {
    let journal = Journal::default();
    let app = Application::builder("chains")
        .controller(users(&journal))
        .controller(posts(&journal))
        .build()
        .unwrap();

    let captures = vec!["7".to_string(), "99".to_string()];
    assert_eq!(
        app.dispatcher().uri_for("posts/show", &captures).as_deref(),
        Some("/users/7/posts/99")
    );
    assert_eq!(app.dispatcher().uri_for("users/base", &captures), None);
}

#[test]
fn test_unknown_parent_aborts_startup() {
    let journal = Journal::default();
    let err = Application::builder("broken")
        .controller(Scripted::new("Orphans", &journal).action("lost", ":Chained('nowhere') :Args(0)"))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        StartupError::Config(ConfigError::UnknownChainParent { .. })
    ));
}

#[test]
fn test_chaining_from_endpoint_aborts_startup() {
    let journal = Journal::default();
    let err = Application::builder("broken")
        .controller(
            Scripted::new("Bad", &journal)
                .action("end", ":Chained('/') :Args(0)")
                .action("after", ":Chained('end') :Args(0)"),
        )
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        StartupError::Config(ConfigError::ChainedFromEndpoint { .. })
    ));
}
