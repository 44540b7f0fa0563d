//! End-to-end rendering scenarios over real prompt trees.

mod common;

use std::collections::HashMap;

use common::PromptTree;
use prompy::{render_diagnostic, ListFilters, PrompyError};

#[test]
fn simple_expansion() {
    let tree = PromptTree::new();
    tree.fragment(
        "generic/all-tests-pass",
        "You know when you are finished when all tests pass.",
    );

    let out = tree
        .render("1. Implement some functionality.\n2. {{ @generic/all-tests-pass() }}\n")
        .unwrap();
    assert_eq!(
        out,
        "1. Implement some functionality.\n2. You know when you are finished when all tests pass.\n"
    );
}

#[test]
fn nested_expansion_with_arguments() {
    let tree = PromptTree::new().with_project("my-proj");
    tree.write(
        "projects/my-proj/init-shell.md",
        "uv venv && uv sync --all-extras && source .venv/bin/activate",
    );
    tree.fragment(
        "generic/init-shell",
        "Run the following command first: `{{ @project/init-shell() }}`",
    );
    tree.fragment(
        "generic/all-tests-pass",
        "You know when you are finished when all tests pass.",
    );

    let out = tree
        .render("1. {{ @generic/init-shell() }}\n2. Implement.\n3. {{ @generic/all-tests-pass() }}\n")
        .unwrap();
    let first_line = out.lines().next().unwrap();
    assert_eq!(
        first_line,
        "1. Run the following command first: `uv venv && uv sync --all-extras && source .venv/bin/activate`"
    );
}

#[test]
fn required_argument_failure() {
    let tree = PromptTree::new();
    tree.fragment(
        "finish-when",
        "---\nargs: {tasks: null}\n---\nDo: {{ tasks }}",
    );

    let err = tree.render("{{ @finish-when() }}").unwrap_err();
    match &err {
        PrompyError::MissingArgument {
            name, slug, line, ..
        } => {
            assert_eq!(name, "tasks");
            assert_eq!(slug, "finish-when");
            assert_eq!(*line, 1);
        }
        other => panic!("expected MissingArgument, got {other:?}"),
    }
    let diagnostic = render_diagnostic(&err);
    assert!(diagnostic
        .starts_with("Error: Missing required argument 'tasks' for fragment @finish-when"));
    assert!(diagnostic.contains("at line: 1"));
}

#[test]
fn cycle_between_two_fragments() {
    let tree = PromptTree::new();
    tree.fragment("a", "{{ @b() }}");
    tree.fragment("b", "{{ @a() }}");

    let err = tree.render("{{ @a() }}").unwrap_err();
    match &err {
        PrompyError::Cycle { chain, .. } => {
            assert_eq!(chain, &["<top>", "a", "b", "a"]);
        }
        other => panic!("expected Cycle, got {other:?}"),
    }
    let diagnostic = render_diagnostic(&err);
    assert!(diagnostic.contains("@<top> -> @a -> @b -> @a"));
}

#[test]
fn missing_fragment_reports_search_paths() {
    let tree = PromptTree::new().with_project("my-proj");

    let err = tree.render("{{ @project/nope() }}").unwrap_err();
    match &err {
        PrompyError::MissingFragment { slug, searched, .. } => {
            assert_eq!(slug, "project/nope");
            assert_eq!(
                searched,
                &vec![tree.root().join("projects/my-proj/nope.md")]
            );
        }
        other => panic!("expected MissingFragment, got {other:?}"),
    }
    let diagnostic = render_diagnostic(&err);
    assert!(diagnostic.contains("searched paths:"));
    assert!(diagnostic.contains("projects/my-proj/nope.md"));
}

#[test]
fn missing_fragment_probes_both_roots_in_order() {
    let project_tree = PromptTree::new();
    let user_tree = PromptTree::new();
    let roots = vec![
        project_tree.root().to_path_buf(),
        user_tree.root().join("prompts"),
    ];

    let err = prompy::render(
        "{{ @project/nope() }}",
        &HashMap::new(),
        Some("my-proj"),
        None,
        &roots,
    )
    .unwrap_err();
    match err {
        PrompyError::MissingFragment { searched, .. } => {
            assert_eq!(
                searched,
                vec![
                    project_tree.root().join("projects/my-proj/nope.md"),
                    user_tree.root().join("prompts/projects/my-proj/nope.md"),
                ]
            );
        }
        other => panic!("expected MissingFragment, got {other:?}"),
    }
}

#[test]
fn rename_updates_references_byte_for_byte() {
    let tree = PromptTree::new();
    tree.fragment("old/name", "the fragment body\n");
    tree.fragment("caller", "See {{ @old/name(x=\"1\") }}.\n");

    prompy::move_fragment(&tree.context(), "old/name", "new/home/name").unwrap();

    assert_eq!(
        tree.read("fragments/caller.md"),
        "See {{ @new/home/name(x=\"1\") }}.\n"
    );
    assert_eq!(
        tree.read("fragments/new/home/name.md"),
        "the fragment body\n"
    );
    assert!(!tree.root().join("fragments/old/name.md").exists());
}

#[test]
fn template_language_features_compose_with_references() {
    let tree = PromptTree::new();
    tree.fragment(
        "step",
        "---\nargs: {verb: null}\n---\n{{ verb | capitalize }} the code",
    );

    let scope = HashMap::from([("mode".to_string(), "review".to_string())]);
    let out = tree
        .render_with_scope(
            "{% if mode == \"review\" %}{{ @step(verb=\"review\") }}{% else %}{{ @step(verb=\"write\") }}{% endif %}",
            &scope,
        )
        .unwrap();
    assert_eq!(out, "Review the code");
}

#[test]
fn sibling_references_expand_independently() {
    let tree = PromptTree::new();
    tree.fragment(
        "greet",
        "---\nargs: {who: null}\n---\nhello {{ who }}",
    );

    let out = tree
        .render("{{ @greet(who=\"a\") }} / {{ @greet(who=\"b\") }}")
        .unwrap();
    assert_eq!(out, "hello a / hello b");
}

#[test]
fn project_root_overrides_user_root() {
    let project_tree = PromptTree::new();
    let user_tree = PromptTree::new();
    project_tree.fragment("shared", "local version");
    user_tree.fragment("shared", "global version");

    let out = prompy::render(
        "{{ @shared() }}",
        &HashMap::new(),
        None,
        None,
        &[
            project_tree.root().to_path_buf(),
            user_tree.root().to_path_buf(),
        ],
    )
    .unwrap();
    assert_eq!(out, "local version");
}

#[test]
fn legacy_bare_reference_form_renders() {
    let tree = PromptTree::new();
    tree.fragment("tail", "done");

    let out = tree.render("Work, then: @tail()\n").unwrap();
    assert_eq!(out, "Work, then: done\n");
}

#[test]
fn backslash_argument_values_render_verbatim() {
    let tree = PromptTree::new();
    tree.fragment(
        "echo-path",
        "---\nargs: {path: null}\n---\nRun it from {{ path }}",
    );

    let out = tree
        .render(r#"{{ @echo-path(path="C:\\tools\\bin") }}"#)
        .unwrap();
    assert_eq!(out, r"Run it from C:\tools\bin");
}

#[test]
fn quoted_argument_values_survive_escaping() {
    let tree = PromptTree::new();
    tree.fragment("quote", "---\nargs: {msg: null}\n---\n> {{ msg }}");

    let out = tree
        .render(r#"{{ @quote(msg="say \"hi\" and 'bye'") }}"#)
        .unwrap();
    assert_eq!(out, r#"> say "hi" and 'bye'"#);
}

#[test]
fn multi_line_argument_values_are_substituted_verbatim() {
    let tree = PromptTree::new();
    tree.fragment("lines", "one\ntwo");
    tree.fragment("wrap", "---\nargs: {body: null}\n---\n<{{ body }}>");

    let out = tree.render("{{ @wrap(body=@lines()) }}").unwrap();
    assert_eq!(out, "<one\ntwo>");
}

#[test]
fn listing_matches_rendered_tree() {
    let tree = PromptTree::new().with_project("p").with_language("rust");
    tree.fragment("a", "---\ndescription: Fragment A\n---\nA");
    tree.write("projects/p/setup.md", "S");
    tree.write("languages/rust/style.md", "L");

    let catalog = prompy::list_fragments(&tree.context(), &ListFilters::default()).unwrap();
    let slugs: Vec<&str> = catalog.entries.iter().map(|e| e.slug.as_str()).collect();
    assert_eq!(slugs, vec!["a", "language/style", "project/setup"]);
    assert_eq!(
        catalog.entries[0].description.as_deref(),
        Some("Fragment A")
    );
}

#[test]
fn syntax_error_diagnostic_carries_caret_snippet() {
    let tree = PromptTree::new();
    let err = tree.render("line one\n{{ @bad(, ) }}\n").unwrap_err();
    match &err {
        PrompyError::Syntax { line, snippet, .. } => {
            assert_eq!(*line, 2);
            assert!(snippet.as_deref().unwrap().contains('^'));
        }
        other => panic!("expected Syntax, got {other:?}"),
    }
}
