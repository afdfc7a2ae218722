//! Line commands typed at the console.

use crate::app::{Action, App};
use crate::shell::{MenuItem, Preference, ShellCommand};
use crate::sidebar::Badge;

/// A server reference: 1-based position in the server list, or a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Position(usize),
    Url(String),
}

impl Target {
    fn parse(word: &str) -> Self {
        match word.parse::<usize>() {
            Ok(n) => Target::Position(n),
            Err(_) => Target::Url(word.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Help,
    List,
    Menu,
    /// Submit the add-server form (empty means the default server).
    Add(String),
    /// Open the add-server form.
    AddNew,
    Select(Target),
    Remove(Target),
    /// Move a server to a 1-based position.
    Move(Target, usize),
    Toggle(Preference),
    Back,
    Forward,
    Reload { ignoring_cache: bool },
    ClearCertificates,
    Show,
    Hide,
    /// Simulate the main window gaining or losing focus.
    Focus(bool),
    Open(String),
    Reset,
    About,
    Quit,
}

pub const HELP: &str = "\
commands:
  list                    show servers
  menu                    show the application menu
  add [url|name]          add a server (empty: default server)
  new                     open the add-server form
  select <n|url>          switch to a server
  remove <n|url>          remove a server
  move <n|url> <pos>      reorder a server
  toggle <preference>     tray | status | unread | menubar | sidebar | fullscreen
  back | forward          navigate the active server
  reload [--hard]         reload the active server
  clear-certificates      forget trusted certificates and reload
  show | hide             main window visibility
  focus | blur            main window focus
  open <url>              open a URL in the system browser
  reset                   reset app data
  about | help | quit";

fn parse_preference(word: &str) -> Option<Preference> {
    match word {
        "tray" | "showTrayIcon" => Some(Preference::ShowTrayIcon),
        "status" | "showUserStatusInTray" => Some(Preference::ShowUserStatusInTray),
        "unread" | "showWindowOnUnreadChanged" => Some(Preference::ShowWindowOnUnreadChanged),
        "menubar" | "showMenuBar" => Some(Preference::ShowMenuBar),
        "sidebar" | "showServerList" => Some(Preference::ShowServerList),
        "fullscreen" | "showFullScreen" => Some(Preference::ShowFullScreen),
        _ => None,
    }
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let target = |usage: &str| -> Result<Target, String> {
        rest.first()
            .map(|w| Target::parse(w))
            .ok_or_else(|| format!("usage: {}", usage))
    };

    let input = match command {
        "help" | "?" => Input::Help,
        "list" | "ls" => Input::List,
        "menu" => Input::Menu,
        "add" => Input::Add(rest.join(" ")),
        "new" => Input::AddNew,
        "select" | "s" => Input::Select(target("select <n|url>")?),
        "remove" | "rm" => Input::Remove(target("remove <n|url>")?),
        "move" | "mv" => {
            let usage = "usage: move <n|url> <pos>";
            let position = rest
                .get(1)
                .and_then(|w| w.parse::<usize>().ok())
                .filter(|&p| p > 0)
                .ok_or_else(|| usage.to_string())?;
            Input::Move(target("move <n|url> <pos>")?, position)
        }
        "toggle" => {
            let word = rest.first().copied().unwrap_or_default();
            let preference =
                parse_preference(word).ok_or_else(|| format!("unknown preference '{}'", word))?;
            Input::Toggle(preference)
        }
        "back" => Input::Back,
        "forward" => Input::Forward,
        "reload" => Input::Reload {
            ignoring_cache: rest.first() == Some(&"--hard"),
        },
        "clear-certificates" => Input::ClearCertificates,
        "show" => Input::Show,
        "hide" => Input::Hide,
        "focus" => Input::Focus(true),
        "blur" => Input::Focus(false),
        "open" => Input::Open(
            rest.first()
                .map(|w| w.to_string())
                .ok_or_else(|| "usage: open <url>".to_string())?,
        ),
        "reset" => Input::Reset,
        "about" => Input::About,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(input))
}

/// `true` for affirmative answers to a yes/no question.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ============================================================================
// Dispatch
// ============================================================================

/// Resolve a target against the current server order.
fn resolve(app: &App, target: &Target) -> Result<String, String> {
    match target {
        Target::Position(n) => n
            .checked_sub(1)
            .and_then(|i| app.sidebar.order().get(i))
            .cloned()
            .ok_or_else(|| format!("no server at position {}", n)),
        Target::Url(url) => {
            let url = url.trim_end_matches('/');
            if app.registry.host_exists(url) {
                Ok(url.to_string())
            } else {
                Err(format!("unknown server '{}'", url))
            }
        }
    }
}

fn resolve_or_report(app: &App, target: &Target) -> Option<String> {
    resolve(app, target)
        .map_err(|message| println!("{}", message))
        .ok()
}

/// Handle one typed line.
pub fn handle_line(app: &mut App, line: &str) -> Action {
    app.touch();
    let input = match parse_line(line) {
        Ok(Some(input)) => input,
        Ok(None) => return Action::Continue,
        Err(message) => {
            println!("{}", message);
            return Action::Continue;
        }
    };

    let command = match input {
        Input::Help => {
            println!("{}", HELP);
            return Action::Continue;
        }
        Input::List => {
            print_servers(app);
            return Action::Continue;
        }
        Input::Menu => {
            print_menu(&app.shell.menu().presentation().template, 0);
            return Action::Continue;
        }
        Input::Add(raw) => {
            app.submit_host_input(&raw);
            return Action::Continue;
        }
        Input::Focus(focused) => {
            app.shell.set_focused(focused);
            return Action::Continue;
        }
        Input::AddNew => ShellCommand::AddNewServer,
        Input::Select(target) => {
            let Some(url) = resolve_or_report(app, &target) else {
                return Action::Continue;
            };
            ShellCommand::SelectServer { url }
        }
        Input::Remove(target) => {
            let Some(url) = resolve_or_report(app, &target) else {
                return Action::Continue;
            };
            ShellCommand::RemoveServer { url }
        }
        Input::Move(target, position) => {
            let Some(url) = resolve_or_report(app, &target) else {
                return Action::Continue;
            };
            ShellCommand::MoveServer {
                url,
                index: position - 1,
            }
        }
        Input::Toggle(preference) => ShellCommand::Toggle { preference },
        Input::Back => ShellCommand::GoBack,
        Input::Forward => ShellCommand::GoForward,
        Input::Reload { ignoring_cache } => ShellCommand::ReloadServer {
            ignoring_cache,
            clear_certificates: false,
        },
        Input::ClearCertificates => ShellCommand::ReloadServer {
            ignoring_cache: false,
            clear_certificates: true,
        },
        Input::Show => ShellCommand::SetMainWindowVisibility { visible: true },
        Input::Hide => ShellCommand::SetMainWindowVisibility { visible: false },
        Input::Open(url) => ShellCommand::OpenUrl { url },
        Input::Reset => ShellCommand::ResetAppData,
        Input::About => ShellCommand::About,
        Input::Quit => ShellCommand::Quit,
    };
    app.handle_command(command)
}

fn print_servers(app: &App) {
    let items = app.sidebar.items();
    if items.is_empty() {
        println!("no servers; type 'add <url>'");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        let badge = match item.badge {
            Some(Badge::Count(0)) | None => String::new(),
            Some(Badge::Count(n)) => format!(" ({})", n),
            Some(Badge::Dot) => " (•)".to_string(),
        };
        println!(
            "{} {:>2}. [{}] {} <{}>{}",
            if item.active { "*" } else { " " },
            i + 1,
            item.abbreviation,
            item.label,
            item.url,
            badge
        );
    }
    if let Some(text) = app.sidebar.global_badge().badge_text() {
        println!("unread: {}", text);
    }
}

fn print_menu(items: &[MenuItem], depth: usize) {
    let indent = "  ".repeat(depth);
    for item in items {
        match item {
            MenuItem::Submenu { label, items } => {
                println!("{}{}", indent, label);
                print_menu(items, depth + 1);
            }
            MenuItem::Command {
                label, accelerator, ..
            } => match accelerator {
                Some(acc) => println!("{}{}  ({})", indent, label, acc),
                None => println!("{}{}", indent, label),
            },
            MenuItem::Checkbox {
                label,
                checked,
                enabled,
                ..
            } => {
                let mark = if *checked { "x" } else { " " };
                let disabled = if *enabled { "" } else { " (disabled)" };
                println!("{}[{}] {}{}", indent, mark, label, disabled);
            }
            MenuItem::Radio { label, checked, .. } => {
                let mark = if *checked { "*" } else { " " };
                println!("{}({}) {}", indent, mark, label);
            }
            MenuItem::Role { role, .. } => println!("{}{:?}", indent, role),
            MenuItem::Separator => println!("{}----", indent),
        }
    }
}
