use std::str::FromStr;

use async_channel::Receiver;
use serde_json::Value;
use thiserror::Error;
use toast_engine::record::Handlers;
use toast_engine::types::CloseReason;
use toast_engine::{Container, CreateOptions, Toaster};
use tracing::{info, warn};

/// One line of daemon input.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Toast { message: String, sticky: bool },
    Close(String),
    Click(String),
    Action {
        id: String,
        key: String,
        data: Option<Value>,
    },
    Pause(String),
    Resume(String),
    Collapse,
    Expand,
    Clear,
    List,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("invalid action payload: {0}")]
    Payload(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let id = |command: &'static str| {
            rest.split_whitespace()
                .next()
                .map(str::to_string)
                .ok_or(CommandError::MissingArgument {
                    command,
                    expected: "a toast id",
                })
        };
        match verb {
            "" => Err(CommandError::Empty),
            "toast" | "sticky" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: if verb == "toast" { "toast" } else { "sticky" },
                        expected: "a message",
                    });
                }
                Ok(Self::Toast {
                    message: rest.to_string(),
                    sticky: verb == "sticky",
                })
            }
            "close" => id("close").map(Self::Close),
            "click" => id("click").map(Self::Click),
            "pause" => id("pause").map(Self::Pause),
            "resume" => id("resume").map(Self::Resume),
            "action" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let (Some(id), Some(key)) = (parts.next().filter(|s| !s.is_empty()), parts.next()) else {
                    return Err(CommandError::MissingArgument {
                        command: "action",
                        expected: "a toast id and an action key",
                    });
                };
                let data = parts
                    .next()
                    .map(str::trim)
                    .filter(|raw| !raw.is_empty())
                    .map(serde_json::from_str::<Value>)
                    .transpose()
                    .map_err(|err| CommandError::Payload(err.to_string()))?;
                Ok(Self::Action {
                    id: id.to_string(),
                    key: key.to_string(),
                    data,
                })
            }
            "collapse" => Ok(Self::Collapse),
            "expand" => Ok(Self::Expand),
            "clear" => Ok(Self::Clear),
            "list" => Ok(Self::List),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Apply commands until the queue closes.
pub async fn run_commands(rx: Receiver<Command>, toaster: Toaster, container: Container) {
    while let Ok(command) = rx.recv().await {
        if let Some(output) = execute(command, &toaster, &container).await {
            println!("{output}");
        }
    }
}

/// Run one command; returns a line to print, if any.
pub async fn execute(command: Command, toaster: &Toaster, container: &Container) -> Option<String> {
    match command {
        Command::Toast { message, sticky } => {
            let mut options = CreateOptions::new()
                .container(container.name())
                .handlers(logging_handlers());
            if sticky {
                options = options.sticky();
            }
            Some(toaster.simple(message, options).identifier.clone())
        }
        Command::Close(id) => {
            container.dismiss(&id);
            None
        }
        Command::Click(id) => {
            let toast = mounted(container, &id)?;
            let closed = toast.click().await;
            Some(format!("{id} click closed={closed}"))
        }
        Command::Action { id, key, data } => {
            let toast = mounted(container, &id)?;
            let closed = toast.action(&key, data).await;
            Some(format!("{id} action {key} closed={closed}"))
        }
        Command::Pause(id) => {
            mounted(container, &id)?.pause();
            None
        }
        Command::Resume(id) => {
            mounted(container, &id)?.resume();
            None
        }
        Command::Collapse => {
            container.set_collapsed(true);
            None
        }
        Command::Expand => {
            container.set_collapsed(false);
            None
        }
        Command::Clear => {
            let scheduled = container.clear();
            Some(format!("clearing {scheduled}"))
        }
        Command::List => match serde_json::to_string(&container.view()) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(error = %err, "failed to render container view");
                None
            }
        },
    }
}

fn mounted(container: &Container, id: &str) -> Option<toast_engine::ToastController> {
    let toast = container.toast(id);
    if toast.is_none() {
        warn!(container = container.name(), toast = id, "no such toast");
    }
    toast
}

fn logging_handlers() -> Handlers {
    Handlers::default()
        .on_open(|| info!("toast visible"))
        .on_close(|reason: CloseReason| info!(%reason, "toast dismissed"))
}
