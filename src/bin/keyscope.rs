// Keyscope CLI
// Replays a scripted key event stream through nested shortcut scopes

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;

use keyscope_core::{
    handler, set_ignore_event_predicate, HandlerMap, InstanceId, KeyEvent, KeyEventManager,
    Scenario, ScenarioSettings,
};

/// Scoped keyboard shortcut simulator
#[derive(Parser, Debug)]
#[command(name = "keyscope")]
#[command(version)]
#[command(about = "Replay key events through nested shortcut scopes", long_about = None)]
struct Args {
    /// TOML scenario file (defaults to ~/.config/keyscope/scenario.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate the scenario and exit
    #[arg(long)]
    check_config: bool,
}

/// An action that fired while replaying
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fired {
    scope: String,
    action: String,
    key: String,
}

type FiredLog = Arc<Mutex<Vec<Fired>>>;

struct Application {
    scenario: Scenario,
    manager: KeyEventManager,
    fired: FiredLog,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("keyscope").join("scenario.toml"))
}

fn install_ignore_predicate(settings: &ScenarioSettings) {
    if settings.ignore_targets.is_empty() {
        return;
    }
    let tags: Vec<String> = settings
        .ignore_targets
        .iter()
        .map(|t| t.to_ascii_lowercase())
        .collect();
    set_ignore_event_predicate(move |event| {
        event.target.as_ref().is_some_and(|target| {
            target.content_editable || tags.contains(&target.tag.to_ascii_lowercase())
        })
    });
}

impl Application {
    fn new_with_config(config_path: PathBuf) -> Result<Self> {
        let scenario = Scenario::from_toml_path(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        Self::from_scenario(scenario)
    }

    fn from_scenario(scenario: Scenario) -> Result<Self> {
        install_ignore_predicate(&scenario.settings);

        let fired = FiredLog::default();
        let mut manager = KeyEventManager::new(InstanceId::from(0));

        // Focus bubbles from the innermost scope, which the file lists last
        for scope in scenario.scopes.iter().rev() {
            let handlers: HandlerMap = scope
                .handlers
                .iter()
                .map(|action| {
                    let fired = fired.clone();
                    let record = Fired {
                        scope: scope.name.clone(),
                        action: action.clone(),
                        key: String::new(),
                    };
                    let callback = handler(move |event: &KeyEvent| {
                        fired.lock().push(Fired {
                            key: event.key.clone(),
                            ..record.clone()
                        });
                    });
                    (action.clone(), callback)
                })
                .collect();

            let index = manager
                .register_scope(&scope.keymap, handlers)
                .with_context(|| format!("invalid keymap in scope '{}'", scope.name))?;
            log::debug!("scope '{}' registered at index {}", scope.name, index);
        }

        Ok(Self {
            scenario,
            manager,
            fired,
        })
    }

    fn validate(&self) {
        println!(
            "Scenario is valid: {} scope(s), {} event(s), longest sequence {}",
            self.manager.scope_count(),
            self.scenario.events.len(),
            self.manager.longest_sequence()
        );
    }

    /// Deliver every scripted event and collect the actions that fired
    fn replay(&mut self) -> Result<Vec<Fired>> {
        if self.manager.scope_count() == 0 {
            bail!("scenario declares no scopes");
        }

        for entry in &self.scenario.events {
            for (event_type, event) in entry.expand()? {
                log::trace!("delivering {} {}", event_type, event.key);
                self.manager.propagate(event_type, &event);
            }
        }

        Ok(std::mem::take(&mut *self.fired.lock()))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = match args.config.clone().or_else(default_config_path) {
        Some(path) => path,
        None => bail!("--config is required when no config directory is available"),
    };

    let mut app = Application::new_with_config(config_path)?;

    if args.check_config {
        app.validate();
        return Ok(());
    }

    let fired = app.replay()?;
    if fired.is_empty() {
        println!("No actions fired");
    }
    for f in &fired {
        println!("{:<12} {:<20} ({})", f.scope, f.action, f.key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
        [[scope]]
        name = "app"
        handlers = ["save", "quit"]
        [scope.keymap]
        save = "ctrl+s"
        quit = "ctrl+q"

        [[scope]]
        name = "editor"
        handlers = ["save", "g g"]

        [[event]]
        tap = "ctrl+s"

        [[event]]
        tap = "ctrl+q"

        [[event]]
        tap = "g g"
    "#;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["keyscope", "--config", "/tmp/scenario.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/scenario.toml")));
        assert!(!args.verbose);
        assert!(!args.check_config);
    }

    #[test]
    fn test_args_check_config() {
        let args = Args::parse_from(["keyscope", "-c", "/tmp/scenario.toml", "--check-config", "-v"]);

        assert!(args.check_config);
        assert!(args.verbose);
    }

    #[test]
    fn test_replay_resolves_innermost_handler() {
        let scenario = Scenario::from_toml(SCENARIO).unwrap();
        let mut app = Application::from_scenario(scenario).unwrap();
        assert_eq!(app.manager.scope_count(), 2);

        let fired: Vec<(String, String)> = app
            .replay()
            .unwrap()
            .into_iter()
            .map(|f| (f.scope, f.action))
            .collect();
        assert_eq!(
            fired,
            vec![
                ("editor".to_string(), "save".to_string()),
                ("app".to_string(), "quit".to_string()),
                ("editor".to_string(), "g g".to_string()),
            ]
        );
    }

    #[test]
    fn test_replay_without_scopes_fails() {
        let scenario = Scenario::from_toml("[[event]]\ntap = \"a\"\n").unwrap();
        let mut app = Application::from_scenario(scenario).unwrap();
        assert!(app.replay().is_err());
    }
}
