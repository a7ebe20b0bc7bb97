use super::*;
use crate::context::ActionMatch;
use crate::controller::{ActionTable, Controller, Registry};
use crate::error::ConfigError;
use http::Method;

/// Controller declaring `(name, attributes)` pairs with no-op bodies.
struct Decls {
    name: &'static str,
    actions: &'static [(&'static str, &'static str)],
}

impl Controller for Decls {
    fn name(&self) -> &str {
        self.name
    }

    fn actions(&self, table: &mut ActionTable) -> Result<(), ConfigError> {
        for (name, attrs) in self.actions {
            table.action(name, |_, _| Ok(())).attrs(attrs)?;
        }
        Ok(())
    }
}

fn registry(controllers: Vec<Decls>) -> Registry {
    controllers
        .into_iter()
        .fold(Registry::builder(), |b, c| b.controller(c))
        .build()
        .unwrap()
}

fn setup<D: DispatchType>(mut dt: D, registry: &Registry) -> Result<D, ConfigError> {
    for action in registry.actions() {
        dt.register_action(action)?;
    }
    dt.finalize()?;
    Ok(dt)
}

fn leaf<'a>(registry: &'a Registry, m: &ActionMatch) -> &'a str {
    registry.action(m.action).private_path()
}

const FOO: Decls = Decls {
    name: "Foo",
    actions: &[
        ("bar", ":Path('baz') :Args(1)"),
        ("index", ":Path('')"),
        ("about", ":Global :Args(0)"),
        ("hidden", ""),
    ],
};

#[test]
fn test_path_exact_args() {
    let reg = registry(vec![FOO]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();
    assert_eq!(dt.len(), 3);

    let m = dt.resolve(&Method::GET, "/foo/baz/42").unwrap();
    assert_eq!(leaf(&reg, &m), "foo/bar");
    assert_eq!(m.args, vec!["42"]);
    assert_eq!(m.matched_path, "foo/baz");
    assert_eq!(m.dispatch_type, "Path");
    assert!(m.chain.is_empty());
}

#[test]
fn test_path_falls_back_to_shorter_prefix() {
    let reg = registry(vec![FOO]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();

    // `foo/baz` wants exactly one argument; the slurpy index takes the request.
    let m = dt.resolve(&Method::GET, "/foo/baz").unwrap();
    assert_eq!(leaf(&reg, &m), "foo/index");
    assert_eq!(m.args, vec!["baz"]);

    let m = dt.resolve(&Method::GET, "/foo/").unwrap();
    assert_eq!(leaf(&reg, &m), "foo/index");
    assert!(m.args.is_empty());
}

#[test]
fn test_path_global_and_misses() {
    let reg = registry(vec![FOO]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();

    assert_eq!(leaf(&reg, &dt.resolve(&Method::GET, "/about").unwrap()), "foo/about");
    assert!(dt.resolve(&Method::GET, "/about/more").is_none());
    assert!(dt.resolve(&Method::GET, "/").is_none());
    assert!(dt.resolve(&Method::GET, "/foo/hidden").is_some_and(|m| leaf(&reg, &m) == "foo/index"));
}

#[test]
fn test_path_specificity_order() {
    let reg = registry(vec![Decls {
        name: "Item",
        actions: &[
            ("any", ":Path('')"),
            ("one", ":Path('') :Args(1)"),
            ("zero", ":Path('') :Args(0)"),
            ("two", ":Path('') :Args(2)"),
        ],
    }]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();

    let hit = |p: &str| leaf(&reg, &dt.resolve(&Method::GET, p).unwrap()).to_string();
    assert_eq!(hit("/item"), "item/zero");
    assert_eq!(hit("/item/a"), "item/one");
    assert_eq!(hit("/item/a/b"), "item/two");
    assert_eq!(hit("/item/a/b/c"), "item/any");
}

#[test]
fn test_path_method_restricted_first() {
    let reg = registry(vec![Decls {
        name: "Form",
        actions: &[
            ("show", ":Path('') :Args(0)"),
            ("submit", ":Path('') :Args(0) :Method('POST')"),
        ],
    }]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();

    assert_eq!(leaf(&reg, &dt.resolve(&Method::POST, "/form").unwrap()), "form/submit");
    assert_eq!(leaf(&reg, &dt.resolve(&Method::GET, "/form").unwrap()), "form/show");
}

#[test]
fn test_path_method_mismatch_is_no_match() {
    let reg = registry(vec![Decls {
        name: "Api",
        actions: &[("create", ":Local :Args(0) :Method('POST PUT')")],
    }]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();
    assert!(dt.resolve(&Method::GET, "/api/create").is_none());
    assert!(dt.resolve(&Method::PUT, "/api/create").is_some());
}

#[test]
fn test_path_duplicate_is_rejected() {
    let reg = registry(vec![
        Decls {
            name: "A",
            actions: &[("x", ":Path('/same') :Args(0)")],
        },
        Decls {
            name: "B",
            actions: &[("y", ":Path('/same') :Args(0)")],
        },
    ]);
    let err = setup(PathDispatchType::new(), &reg).unwrap_err();
    assert_eq!(
        err,
        ConfigError::DuplicatePath {
            dispatch_type: "Path".into(),
            path: "/same".into(),
            existing: "a/x".into(),
            action: "b/y".into(),
        }
    );
}

#[test]
fn test_path_args_are_decoded() {
    let reg = registry(vec![FOO]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();
    let m = dt.resolve(&Method::GET, "/foo/baz/hello%20world").unwrap();
    assert_eq!(m.args, vec!["hello world"]);
}

#[test]
fn test_path_list_and_uri_for() {
    let reg = registry(vec![FOO]);
    let dt = setup(PathDispatchType::new(), &reg).unwrap();

    let paths: Vec<String> = dt.list().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/about", "/foo", "/foo/baz"]);

    let bar = reg.action_by_private_path("foo/bar").unwrap();
    assert_eq!(dt.uri_for_action(bar, &[]).as_deref(), Some("/foo/baz"));
    assert_eq!(dt.uri_for_action(bar, &["x".into()]), None);
    let hidden = reg.action_by_private_path("foo/hidden").unwrap();
    assert_eq!(dt.uri_for_action(hidden, &[]), None);
}

const USERS: Decls = Decls {
    name: "Users",
    actions: &[
        ("base", ":Chained('/') :PathPart('users') :CaptureArgs(0)"),
        ("list", ":Chained('base') :PathPart('') :Args(0)"),
        ("user", ":Chained('base') :PathPart('') :CaptureArgs(1)"),
        ("view", ":Chained('user') :PathPart('view') :Args(0)"),
        ("edit", ":Chained('user') :PathPart('edit') :Args(0) :Method('POST')"),
        ("files", ":Chained('user') :PathPart('files') :Args"),
    ],
};

#[test]
fn test_chained_is_low_precedence_by_default() {
    assert!(ChainedDispatchType::new().is_low_precedence());
    assert!(!ChainedDispatchType::new()
        .with_low_precedence(false)
        .is_low_precedence());
    assert!(!PathDispatchType::new().is_low_precedence());
}

#[test]
fn test_chained_walks_captures() {
    let reg = registry(vec![USERS]);
    let dt = setup(ChainedDispatchType::new(), &reg).unwrap();
    assert_eq!(dt.len(), 6);

    let m = dt.resolve(&Method::GET, "/users/42/view").unwrap();
    assert_eq!(leaf(&reg, &m), "users/view");
    assert_eq!(m.dispatch_type, "Chained");
    assert!(m.args.is_empty());
    let steps: Vec<(&str, Vec<String>)> = m
        .chain
        .iter()
        .map(|s| (reg.action(s.action).name(), s.captures.clone()))
        .collect();
    assert_eq!(
        steps,
        vec![("base", vec![]), ("user", vec!["42".to_string()])]
    );
    assert_eq!(m.captures(), vec!["42"]);
    assert_eq!(m.matched_path, "users/42/view");
}

#[test]
fn test_chained_empty_path_part() {
    let reg = registry(vec![USERS]);
    let dt = setup(ChainedDispatchType::new(), &reg).unwrap();
    let m = dt.resolve(&Method::GET, "/users").unwrap();
    assert_eq!(leaf(&reg, &m), "users/list");
    assert_eq!(m.chain.len(), 1);
}

#[test]
fn test_chained_endpoint_args_and_methods() {
    let reg = registry(vec![USERS]);
    let dt = setup(ChainedDispatchType::new(), &reg).unwrap();

    let m = dt.resolve(&Method::GET, "/users/7/files/a/b").unwrap();
    assert_eq!(leaf(&reg, &m), "users/files");
    assert_eq!(m.args, vec!["a", "b"]);

    assert!(dt.resolve(&Method::GET, "/users/7/edit").is_none());
    assert_eq!(
        leaf(&reg, &dt.resolve(&Method::POST, "/users/7/edit").unwrap()),
        "users/edit"
    );
    assert!(dt.resolve(&Method::GET, "/users/7/view/extra").is_none());
    assert!(dt.resolve(&Method::GET, "/people/7/view").is_none());
}

#[test]
fn test_chained_nested_example() {
    let reg = registry(vec![Decls {
        name: "Root",
        actions: &[
            ("base", ":Chained('/') :PathPart('ns') :CaptureArgs(0)"),
            ("a", ":Chained('base') :PathPart('a') :CaptureArgs(1)"),
            ("leaf", ":Chained('a') :PathPart('b') :Args(1)"),
        ],
    }]);
    let dt = setup(ChainedDispatchType::new(), &reg).unwrap();

    let m = dt.resolve(&Method::GET, "/ns/a/42/b/c").unwrap();
    assert_eq!(leaf(&reg, &m), "leaf");
    let captures: Vec<Vec<String>> = m.chain.iter().map(|s| s.captures.clone()).collect();
    assert_eq!(captures, vec![vec![], vec!["42".to_string()]]);
    assert_eq!(m.args, vec!["c"]);
}

#[test]
fn test_chained_unlimited_captures_backtrack() {
    let reg = registry(vec![Decls {
        name: "Wiki",
        actions: &[
            ("page", ":Chained('/') :PathPart('wiki') :CaptureArgs(-1)"),
            ("edit", ":Chained('page') :PathPart('edit') :Args(0)"),
        ],
    }]);
    let dt = setup(ChainedDispatchType::new(), &reg).unwrap();

    let m = dt.resolve(&Method::GET, "/wiki/a/b/c/edit").unwrap();
    assert_eq!(m.captures(), vec!["a", "b", "c"]);

    let m = dt.resolve(&Method::GET, "/wiki/edit").unwrap();
    assert!(m.captures().is_empty());
    assert!(dt.resolve(&Method::GET, "/wiki/a/b").is_none());
}

#[test]
fn test_chained_prefers_exact_endpoint() {
    let reg = registry(vec![Decls {
        name: "Shop",
        actions: &[
            ("base", ":Chained('/') :PathPart('shop') :CaptureArgs(0)"),
            ("catchall", ":Chained('base') :PathPart('') :Args"),
            ("item", ":Chained('base') :PathPart('item') :Args(1)"),
        ],
    }]);
    let dt = setup(ChainedDispatchType::new(), &reg).unwrap();

    assert_eq!(
        leaf(&reg, &dt.resolve(&Method::GET, "/shop/item/3").unwrap()),
        "shop/item"
    );
    let m = dt.resolve(&Method::GET, "/shop/other/3").unwrap();
    assert_eq!(leaf(&reg, &m), "shop/catchall");
    assert_eq!(m.args, vec!["other", "3"]);
}

#[test]
fn test_chained_unknown_parent() {
    let reg = registry(vec![Decls {
        name: "Bad",
        actions: &[("orphan", ":Chained('nowhere') :Args(0)")],
    }]);
    let err = setup(ChainedDispatchType::new(), &reg).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownChainParent {
            action: "bad/orphan".into(),
            parent: "bad/nowhere".into(),
        }
    );
}

#[test]
fn test_chained_from_endpoint() {
    let reg = registry(vec![Decls {
        name: "Bad",
        actions: &[
            ("end", ":Chained('/') :Args(0)"),
            ("after", ":Chained('end') :Args(0)"),
        ],
    }]);
    let err = setup(ChainedDispatchType::new(), &reg).unwrap_err();
    assert!(matches!(err, ConfigError::ChainedFromEndpoint { .. }));
}

#[test]
fn test_chained_cycle_is_unreachable() {
    let reg = registry(vec![Decls {
        name: "Loop",
        actions: &[
            ("a", ":Chained('b') :CaptureArgs(0)"),
            ("b", ":Chained('a') :CaptureArgs(0)"),
        ],
    }]);
    let err = setup(ChainedDispatchType::new(), &reg).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnreachableChain {
            action: "loop/a".into()
        }
    );
}

#[test]
fn test_chained_duplicate_endpoint() {
    let reg = registry(vec![Decls {
        name: "Dup",
        actions: &[
            ("base", ":Chained('/') :CaptureArgs(0)"),
            ("one", ":Chained('base') :PathPart('x') :Args(0)"),
            ("two", ":Chained('base') :PathPart('x') :Args(0)"),
        ],
    }]);
    let err = setup(ChainedDispatchType::new(), &reg).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicatePath { .. }));
}

#[test]
fn test_chained_list_and_uri_for() {
    let reg = registry(vec![USERS]);
    let dt = setup(ChainedDispatchType::new(), &reg).unwrap();

    let view = dt
        .list()
        .into_iter()
        .find(|r| r.action == "users/view")
        .unwrap();
    assert_eq!(view.path, "/users/*/view");
    assert_eq!(view.chain, vec!["users/base", "users/user"]);

    let action = reg.action_by_private_path("users/view").unwrap();
    assert_eq!(
        dt.uri_for_action(action, &["42".into()]).as_deref(),
        Some("/users/42/view")
    );
    assert_eq!(dt.uri_for_action(action, &[]), None);
    assert_eq!(
        dt.uri_for_action(action, &["a b".into()]).as_deref(),
        Some("/users/a%20b/view")
    );

    let midpoint = reg.action_by_private_path("users/user").unwrap();
    assert_eq!(dt.uri_for_action(midpoint, &["1".into()]), None);
}
