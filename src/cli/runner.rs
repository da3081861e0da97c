//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::TailConfig;
use crate::engine::PollScheduler;
use crate::error::{Error, Result, ResultExt};
use crate::loader::load_config;
use crate::sink::{ChannelSink, Event, JsonLinesSink};
use crate::source::{RowSource, SqliteSource};
use crate::store::open_store;
use crate::types::Cursor;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run { once, buffer } => self.tail(*once, *buffer).await,
            Commands::Tables => self.tables().await,
            Commands::Cursors => self.cursors().await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load and validate the tail configuration
    fn load_config(&self) -> Result<TailConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        load_config(path)
    }

    /// Poll and print events
    async fn tail(&self, once: bool, buffer: usize) -> Result<()> {
        let config = self.load_config()?;

        let (sink, rx) = ChannelSink::channel(buffer);
        let mut scheduler = PollScheduler::from_config(&config, Box::new(sink))?;
        let writer = spawn_writer(rx, self.cli.format);

        let stop = scheduler.stop_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping after the current cycle");
                stop.cancel();
            }
        });

        let result = if once {
            scheduler.run_until_idle().await
        } else {
            scheduler.run().await
        };

        // Closes the channel so the writer drains and exits
        drop(scheduler);
        let written = writer.await.map_err(anyhow::Error::from)?;

        let summary = result?;
        written?;
        info!(
            cycles = summary.cycles,
            rows = summary.rows,
            idle_cycles = summary.idle_cycles,
            "done"
        );
        Ok(())
    }

    /// List tracked tables with their stored cursor
    async fn tables(&self) -> Result<()> {
        let config = self.load_config()?;

        let cursors: HashMap<String, i64> = existing_cursors(&config)
            .await?
            .into_iter()
            .map(|c| (c.table, c.position))
            .collect();

        let mut source = SqliteSource::for_tail(&config);
        let tables = source
            .list_tracked_tables()
            .await
            .context("Failed to list tables")?;
        for table in tables {
            let cursor = cursors.get(&table).copied();
            self.output_message(&json!({ "table": table, "cursor": cursor }));
        }

        Ok(())
    }

    /// Print the cursor store contents
    async fn cursors(&self) -> Result<()> {
        let config = self.load_config()?;

        for cursor in existing_cursors(&config).await? {
            self.output_message(&serde_json::to_value(&cursor)?);
        }

        Ok(())
    }

    /// Validate the configuration file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "valid": true,
            "source": config.source.path,
            "cursor_store": config.cursor_store,
            "batch_size": config.polling.batch_size,
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Stored cursors, without creating the store when it does not exist yet
async fn existing_cursors(config: &TailConfig) -> Result<Vec<Cursor>> {
    if let Some(path) = config.cursor_store.path() {
        if !path.try_exists()? {
            info!(path = %path.display(), "cursor store does not exist yet");
            return Ok(Vec::new());
        }
    }

    let mut store = open_store(&config.cursor_store)?;
    if !store.load_existing().await? {
        info!(store = %store.describe(), "cursor store is empty");
        return Ok(Vec::new());
    }
    store.list().await.context("Failed to read cursors")
}

/// Print events from the channel to stdout until every sender is gone
fn spawn_writer(mut rx: mpsc::Receiver<Event>, format: OutputFormat) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let stdout = std::io::stdout();
        let mut out = match format {
            OutputFormat::Json => JsonLinesSink::new(stdout),
            OutputFormat::Pretty => JsonLinesSink::pretty(stdout),
        };
        while let Some(event) = rx.recv().await {
            out.write_event(&event)?;
        }
        Ok(())
    })
}
