//! Command-line front-end: prints filtered, sorted projections of the
//! locally cached article collection.

use clap::Parser;
use news_aggregator::filters::{self, EndDateFilter, KeywordFilter, StartDateFilter};
use news_aggregator::{Article, FeedManager, NewsAggregator, ParserFactory};
use std::process::ExitCode;

const MAX_FLAGS: usize = 4;

#[derive(Debug, Parser)]
#[command(
    name = "news-cli",
    about = "Print cached news articles",
    after_help = "Values may be attached (--sources=a,b) or separated (--sources a,b)."
)]
struct Args {
    /// Restrict to the named sources, comma-separated.
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Keyword filter, comma-separated (stemmed, case-insensitive).
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Inclusive lower bound, YYYY-DD-MM.
    #[arg(long = "date-start")]
    date_start: Option<String>,

    /// Inclusive upper bound, YYYY-DD-MM.
    #[arg(long = "date-end")]
    date_end: Option<String>,

    /// Sort order: asc or desc.
    #[arg(long = "sort-order", default_value = "asc")]
    sort_order: String,

    /// Dictionary file path.
    #[arg(long, default_value = "config/feeds_dictionary.json", hide = true)]
    config: String,

    /// Snapshot directory path.
    #[arg(long, default_value = "storage", hide = true)]
    storage: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let flag_count = count_flags(std::env::args().skip(1));
    if flag_count > MAX_FLAGS {
        eprintln!("too many flags: at most {} may be combined", MAX_FLAGS);
        eprintln!("usage: news-cli [--sources=a,b] [--keywords=w,x] [--date-start=YYYY-DD-MM] [--date-end=YYYY-DD-MM] [--sort-order=asc|desc]");
        return ExitCode::FAILURE;
    }

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[Error] {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Counts flag arguments only, so a separated value
/// (`--sources a,b`) still counts as one flag.
fn count_flags(args: impl Iterator<Item = String>) -> usize {
    args.filter(|arg| arg.starts_with("--")).count()
}

fn run(args: Args) -> anyhow::Result<()> {
    let manager = FeedManager::new(&args.storage, &args.config)?;

    let resources = if args.sources.is_empty() {
        manager.all_resources()?
    } else {
        manager.selected_resources(&args.sources)?
    };

    let mut aggregator = NewsAggregator::new(Some(ParserFactory::new()))?;
    if !args.keywords.is_empty() {
        aggregator.add_filter(Box::new(KeywordFilter::new(&args.keywords)));
    }
    if let Some(raw) = &args.date_start {
        aggregator.add_filter(Box::new(StartDateFilter::new(raw)?));
    }
    if let Some(raw) = &args.date_end {
        aggregator.add_filter(Box::new(EndDateFilter::new(raw)?));
    }

    let mut articles = aggregator.aggregate_multiple(&resources)?;
    match args.sort_order.as_str() {
        "asc" => filters::sort_ascending(&mut articles),
        "desc" => filters::sort_descending(&mut articles),
        other => anyhow::bail!("unknown sort order: {}", other),
    }

    print_articles(&articles);
    Ok(())
}

fn print_articles(articles: &[Article]) {
    for article in articles {
        println!("Title: {}", article.title);
        println!("Description: {}", article.description);
        println!("Date: {}", article.human_date());
        println!("Source: {}", article.source);
        if let Some(author) = &article.author {
            println!("Author: {}", author);
        }
        if let Some(link) = &article.link {
            println!("Link: {}", link);
        }
        println!();
    }
    if articles.is_empty() {
        println!("no articles matched");
    }
}
