use std::{collections::HashSet, time::Duration};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{AppContext, MainPresenter, PresentTrigger};
use futures::StreamExt;
use shared::domain::PostId;
use tokio::time::sleep;
use tracing::{info, warn};

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "guestbook")]
struct Cli {
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    cache_database_url: Option<String>,
    /// Keep cached responses in memory only.
    #[arg(long)]
    no_cache: bool,
    #[arg(long)]
    auth_token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    Show {
        id: String,
    },
    Post {
        #[arg(long)]
        name: String,
        #[arg(long)]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings()?;
    if let Some(v) = cli.base_url {
        settings.base_url = v;
    }
    if let Some(v) = cli.cache_database_url {
        settings.cache_database_url = v;
    }
    if cli.no_cache {
        settings.cache_database_url.clear();
    }
    if let Some(v) = cli.auth_token {
        settings.auth_token = Some(v);
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let context = AppContext::initialize(settings.context_options()).await?;

    match cli.command {
        Command::List { pages } => {
            list(&context.main_presenter(), pages.max(1), settings.idle_timeout()).await
        }
        Command::Show { id } => show(&context, PostId::new(id), settings.idle_timeout()).await,
        Command::Post { name, body } => {
            let created = context.posts_dao().create_post(&name, &body).await?;
            println!("created post_id={}", created.id);
            Ok(())
        }
    }
}

/// Prints the list until `pages` pages have grown the item list or the feed
/// stays quiet for `idle`.
async fn list(presenter: &MainPresenter, pages: usize, idle: Duration) -> Result<()> {
    let mut title = presenter.title();
    let mut items = presenter.items();
    let mut error = presenter.error();

    let mut printed = HashSet::new();
    let mut loaded_pages = 0;
    let mut last_len = 0;

    loop {
        tokio::select! {
            Some(title) = title.next() => println!("# {title}"),
            Some(items) = items.next() => {
                if items.is_empty() || items.len() > last_len {
                    loaded_pages += 1;
                }
                last_len = items.len();
                for item in items {
                    if printed.insert(item.id.clone()) {
                        println!("{}\t{}", item.id, item.text);
                    }
                }
                if loaded_pages < pages {
                    presenter.load_more();
                }
            }
            Some(Some(failure)) = error.next() => {
                warn!(error = %failure, "list: load failed");
                return Err(anyhow!("failed to load posts: {failure}"));
            }
            _ = sleep(idle) => {
                info!(loaded_pages, items = printed.len(), "list: feed idle");
                return Ok(());
            }
        }
    }
}

async fn show(context: &AppContext, id: PostId, idle: Duration) -> Result<()> {
    let presenter = context.details_presenters().presenter(id);
    let mut ready = presenter.ready_to_present();
    let mut title = presenter.title();
    let mut body = presenter.body();
    let mut error = presenter.error();

    let trigger = ready.next().await;
    info!(post_id = %presenter.id(), ?trigger, "show: view released");
    if trigger == Some(PresentTrigger::TimedOut) {
        println!("loading {}...", presenter.id());
    }

    let mut shown_title = false;
    let mut shown_body = false;
    while !(shown_title && shown_body) {
        tokio::select! {
            Some(title) = title.next(), if !shown_title => {
                println!("# {title}");
                shown_title = true;
            }
            Some(body) = body.next(), if !shown_body => {
                println!("{body}");
                shown_body = true;
            }
            Some(Some(failure)) = error.next() => {
                return Err(anyhow!("failed to load post {}: {failure}", presenter.id()));
            }
            _ = sleep(idle.max(client_core::PRESENT_TIMEOUT)) => {
                return Err(anyhow!("post {} did not load in time", presenter.id()));
            }
        }
    }
    Ok(())
}
