//! Exec command handler
//!
//! Submits a command, prints each chunk as it arrives and exits with the
//! remote status. In push mode the output goes to the given URLs and only
//! the job id is printed.

use anyhow::{Result, bail};
use clap::Args;
use colored::*;
use rce_client::{Poller, PollerConfig, RceClient};
use rce_core::dto::exec::PushTargets;
use std::io::Write;

use crate::config::Config;

#[derive(Args)]
pub struct ExecArgs {
    /// URL receiving the cumulative log (push mode)
    #[arg(long, requires_all = ["push_size", "push_exit"])]
    pub push_log: Option<String>,

    /// URL receiving the final log size (push mode)
    #[arg(long, requires_all = ["push_log", "push_exit"])]
    pub push_size: Option<String>,

    /// URL receiving the exit status (push mode)
    #[arg(long, requires_all = ["push_log", "push_size"])]
    pub push_exit: Option<String>,

    /// Command and arguments to run
    #[arg(last = true, required = true)]
    pub argv: Vec<String>,
}

impl ExecArgs {
    fn push_targets(&self) -> Result<Option<PushTargets>> {
        match (&self.push_log, &self.push_size, &self.push_exit) {
            (Some(log), Some(size), Some(exit)) => Ok(Some(PushTargets {
                log: log.clone(),
                size: size.clone(),
                exit: exit.clone(),
            })),
            (None, None, None) => Ok(None),
            _ => bail!("--push-log, --push-size and --push-exit go together"),
        }
    }
}

/// Handle the exec command
pub async fn handle_exec_command(args: ExecArgs, config: &Config) -> Result<i32> {
    let push = args.push_targets()?;
    let client = RceClient::new(&config.url, &config.auth);
    let poller = Poller::new(client, PollerConfig::default());

    if push.is_some() {
        let uid = poller.submit(args.argv, push).await?;
        println!("{}", uid);
        return Ok(0);
    }

    let uid = poller.submit(args.argv, None).await?;
    tracing::debug!("Following job {}", uid);

    let mut stdout = std::io::stdout();
    let status = poller
        .follow(&uid, |chunk| {
            let _ = writeln!(stdout, "{}", chunk);
            let _ = stdout.flush();
        })
        .await?;

    if status != 0 {
        eprintln!("{}", format!("Job {} exited with status {}", uid, status).yellow());
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use crate::commands::Commands;
    use clap::Parser;

    fn parse(args: &[&str]) -> Result<ExecArgs, clap::Error> {
        let cli = Cli::try_parse_from(args)?;
        match cli.command {
            Commands::Exec(args) => Ok(args),
        }
    }

    #[test]
    fn test_argv_after_separator() {
        let args = parse(&["rce", "--auth", "t", "exec", "--", "ls", "-la", "/tmp"]).unwrap();
        assert_eq!(args.argv, vec!["ls", "-la", "/tmp"]);
        assert!(args.push_targets().unwrap().is_none());
    }

    #[test]
    fn test_push_flags_build_targets() {
        let args = parse(&[
            "rce", "--auth", "t", "exec", "--push-log", "http://l", "--push-size", "http://s",
            "--push-exit", "http://e", "--", "true",
        ])
        .unwrap();

        let targets = args.push_targets().unwrap().unwrap();
        assert_eq!(targets.log, "http://l");
        assert_eq!(targets.size, "http://s");
        assert_eq!(targets.exit, "http://e");
    }

    #[test]
    fn test_partial_push_flags_are_rejected() {
        assert!(parse(&["rce", "--auth", "t", "exec", "--push-log", "http://l", "--", "true"]).is_err());
    }

    #[test]
    fn test_missing_command_is_rejected() {
        assert!(parse(&["rce", "--auth", "t", "exec"]).is_err());
    }
}
