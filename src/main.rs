use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use querybot::agent::{Agent, AgentDeps, Session};
use querybot::channels::{ChannelManager, ChatServer, HttpChannel, OutgoingResponse, ReplChannel};
use querybot::cli::{Cli, Command, run_history_command};
use querybot::config::Config;
use querybot::llm::create_llm_provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_env()?;

    if let Some(Command::History(cmd)) = cli.command.clone() {
        return run_history_command(cmd, &config.history);
    }

    if cli.command.is_none() && cli.no_repl && !cli.http {
        anyhow::bail!("Nothing to do: --no-repl given without --http");
    }

    let llm = create_llm_provider(&config.llm)?;

    tracing::info!("Connecting to {}", config.database.display_target());
    let mut session = Session::open(&config)
        .await
        .context("Failed to set up the database pool")?;

    let agent = Agent::new(AgentDeps {
        llm,
        presentation: config.presentation.clone(),
    });
    let repl = ReplChannel::new(config.presentation.export_dir.clone()).with_color(!cli.no_color);

    if let Some(Command::Ask { question }) = cli.command {
        if let Some(answer) = agent.handle_message(&mut session, &question).await {
            if let Some(sql) = &answer.sql {
                println!("SQL: {}\n", sql);
            }
            println!("{}", repl.render_response(&OutgoingResponse::from(answer)));
        }
        session.close().await;
        return Ok(());
    }

    let channels = ChannelManager::new();
    let repl = if cli.no_repl {
        None
    } else {
        let repl = Arc::new(repl);
        channels.add(repl.clone()).await;
        Some(repl)
    };

    let mut server = None;
    if cli.http {
        let http_config = config
            .http
            .clone()
            .context("HTTP channel needs HTTP_WEBHOOK_SECRET to be set")?;
        let (host, port) = (http_config.host.clone(), http_config.port);
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid HTTP address {}:{}", host, port))?;

        let http = Arc::new(HttpChannel::new(http_config));
        server = Some(ChatServer::start(addr, http.routes()).await?);
        channels.add(http).await;
    }

    tokio::select! {
        result = agent.run(&mut session, &channels) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
        // With --http the merged stream stays open after the REPL quits.
        _ = repl_closed(repl.as_deref()) => tracing::info!("REPL closed, shutting down"),
    }

    channels.shutdown_all().await;
    if let Some(mut server) = server {
        server.shutdown().await;
    }
    session.close().await;

    Ok(())
}

async fn repl_closed(repl: Option<&ReplChannel>) {
    match repl {
        Some(repl) => repl.closed().await,
        None => std::future::pending().await,
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("querybot=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
