//! Menu loop behaviour driven through a scripted console.

use andor_menu::console::{Console, ScriptedInput};
use andor_menu::error::InputError;
use andor_menu::menu::{MenuAction, MenuSystem, SubMenuPolicy, SUBMENU_SENTINEL};
use std::cell::Cell;
use std::rc::Rc;

fn submenu() -> MenuSystem {
    let mut child = MenuSystem::new("sub menu", "> ");
    child.add_entry("x", "leave", MenuAction::None).unwrap();
    child
}

#[test]
fn test_callback_false_redraws_then_true_returns_key() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);

    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry("1", "nothing", MenuAction::None).unwrap();
    menu.add_entry(
        "2",
        "twice",
        MenuAction::callback(move || {
            counter.set(counter.get() + 1);
            counter.get() > 1
        }),
    )
    .unwrap();

    let (console, out, _err) = Console::scripted(ScriptedInput::new(["2", "2"]));
    assert_eq!(menu.run(&console, None).unwrap(), "2");
    assert_eq!(calls.get(), 2);

    // Rendered once per prompt.
    assert_eq!(out.contents().matches("2) twice").count(), 2);
}

#[test]
fn test_submenu_result_is_prefixed_with_parent_key() {
    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry("s", "settings", MenuAction::submenu(submenu()))
        .unwrap();

    let (console, out, _err) = Console::scripted(ScriptedInput::new(["s", "x"]));
    assert_eq!(menu.run(&console, None).unwrap(), "sx");
    assert!(out.contents().contains("sub menu"));
}

#[test]
fn test_invalid_input_reports_and_keeps_prompting() {
    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry("q", "quit", MenuAction::None).unwrap();

    let (console, out, err) = Console::scripted(ScriptedInput::new(["ab", "", "z", "q"]));
    assert_eq!(menu.run(&console, None).unwrap(), "q");

    assert_eq!(err.contents().matches("invalid menu entry\n\n").count(), 3);
    assert_eq!(out.contents().matches("q) quit").count(), 4);
}

#[test]
fn test_end_of_input_fails_without_hanging() {
    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry("q", "quit", MenuAction::None).unwrap();

    let (console, _out, err) = Console::scripted(ScriptedInput::default());
    let result = menu.run(&console, None);

    assert!(matches!(result, Err(InputError::Exhausted)));
    assert_eq!(err.contents(), "you pressed ^D\n");
}

#[test]
fn test_interrupt_at_prompt_ends_run() {
    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry("q", "quit", MenuAction::None).unwrap();

    let (console, _out, err) = Console::scripted(ScriptedInput::default().then_interrupt());
    assert!(matches!(
        menu.run(&console, None),
        Err(InputError::Interrupted)
    ));
    assert_eq!(err.contents(), "you pressed ^C\n");
}

#[test]
fn test_preset_is_dispatched_without_prompting() {
    let seen = Rc::new(Cell::new(false));
    let flag = Rc::clone(&seen);

    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry(
        "1",
        "status",
        MenuAction::callback(move || {
            flag.set(true);
            false
        }),
    )
    .unwrap();
    menu.add_entry("q", "quit", MenuAction::None).unwrap();

    let input = ScriptedInput::new(["q"]);
    let (console, out, _err) = Console::scripted(input);
    assert_eq!(menu.run(&console, Some("1")).unwrap(), "q");

    assert!(seen.get());
    // The preset skipped the first render; only the prompt for "q" drew the menu.
    assert_eq!(out.contents().matches("q) quit").count(), 1);
}

#[test]
fn test_invalid_preset_is_consumed() {
    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry("q", "quit", MenuAction::None).unwrap();

    let (console, _out, err) = Console::scripted(ScriptedInput::new(["q"]));
    assert_eq!(menu.run(&console, Some("nope")).unwrap(), "q");
    assert_eq!(err.contents().matches("invalid menu entry").count(), 1);
}

#[test]
fn test_failed_submenu_propagates_by_default() {
    let mut menu = MenuSystem::new("main", "$ ");
    menu.add_entry("s", "settings", MenuAction::submenu(submenu()))
        .unwrap();

    let (console, _out, _err) = Console::scripted(ScriptedInput::new(["s"]));
    assert!(matches!(
        menu.run(&console, None),
        Err(InputError::Exhausted)
    ));
}

#[test]
fn test_failed_submenu_yields_sentinel_when_configured() {
    let mut menu = MenuSystem::new("main", "$ ").with_submenu_policy(SubMenuPolicy::Sentinel);
    menu.add_entry("s", "settings", MenuAction::submenu(submenu()))
        .unwrap();

    let (console, _out, _err) =
        Console::scripted(ScriptedInput::new(["s"]).then_interrupt());
    assert_eq!(
        menu.run(&console, None).unwrap(),
        format!("s{SUBMENU_SENTINEL}")
    );
}

#[test]
fn test_label_budget_boundary() {
    let mut menu = MenuSystem::new("main", "$ ");
    let max = menu.max_label_len();

    menu.add_entry("a", &"x".repeat(max), MenuAction::None)
        .unwrap();
    let err = menu
        .add_entry("b", &"x".repeat(max + 1), MenuAction::None)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("text must be max {max} chars, got {}", max + 1)
    );
    assert_eq!(menu.entries().len(), 1);
}
