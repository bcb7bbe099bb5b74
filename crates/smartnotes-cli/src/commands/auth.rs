use std::env;

use smartnotes_core::config::{Session, ENV_TOKEN};

use crate::cli::AuthCommands;
use crate::commands::common::{format_timestamp, load_session, session_path};
use crate::error::CliError;

pub fn run_auth(command: AuthCommands) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { token } => {
            let path = session_path()?;
            Session::new(token)?.save_to_path(&path)?;
            println!("Token saved to {}", path.display());
            Ok(())
        }
        AuthCommands::Status => {
            let session = load_session()?;
            let from_env = env::var(ENV_TOKEN).is_ok_and(|value| !value.trim().is_empty());
            if from_env {
                println!("Signed in via {ENV_TOKEN}");
            } else if session.token.is_some() {
                let saved = session
                    .saved_at
                    .map_or_else(|| "unknown".to_string(), format_timestamp);
                println!("Signed in (token saved {saved})");
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            Session::clear_at_path(&session_path()?)?;
            println!("Signed out");
            Ok(())
        }
    }
}
