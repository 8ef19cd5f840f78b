use std::{io::IsTerminal, process::ExitCode};

use clap::Parser;
use lectern::{
    EngineConfig,
    Error,
    Filter,
    Result,
    SearchEngine,
    deep_link::DeepLink,
    observer::Callbacks,
    text_util::{self, Marker},
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("LECTERN_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Search(args) => {
            let engine = open_engine(&args.corpus, cli.page_size).await?;
            cmd_search(&engine, &args)?;
        }
        Command::Info(args) => {
            let engine = open_engine(&args.corpus, cli.page_size).await?;
            cmd_info(&engine, args.json)?;
        }
        Command::Works(args) => {
            let engine = open_engine(&args.corpus, cli.page_size).await?;
            cmd_works(&engine, &args)?;
        }
        Command::Categories(args) => {
            let engine = open_engine(&args.corpus, cli.page_size).await?;
            for category in engine.categories() {
                println!("{category}");
            }
        }
        Command::Get(args) => {
            let engine = open_engine(&args.corpus, cli.page_size).await?;
            cmd_get(&engine, &args)?;
        }
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

async fn open_engine(
    location: &str,
    page_size: Option<usize>,
) -> Result<SearchEngine> {
    let mut config = EngineConfig::from_env()?;
    if let Some(page_size) = page_size {
        config = config.with_page_size(page_size)?;
    }

    let callbacks = Callbacks::new()
        .with_loading(|busy| tracing::debug!(busy, "corpus loading state"));
    let engine = SearchEngine::new(config, callbacks);
    engine.load_corpus(location).await?;
    Ok(engine)
}

fn cmd_search(engine: &SearchEngine, args: &cli::SearchArgs) -> Result<()> {
    if args.work.is_some() {
        engine.set_filter(Filter::Work, args.work.as_deref());
    }
    if args.category.is_some() {
        engine.set_filter(Filter::Category, args.category.as_deref());
    }
    engine.search_now(&args.query);
    if args.page > 1 {
        let page = i64::try_from(args.page - 1).unwrap_or(i64::MAX);
        engine.go_to_page(page);
    }

    let Some(page) = engine.current_page() else {
        println!("No results found.");
        return Ok(());
    };
    let first_rank = page.page * engine.config().page_size + 1;

    if args.json {
        let results: Vec<_> = page
            .results
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let excerpt =
                    engine.excerpt(&hit.chunk.text, None, args.context_words);
                json!({
                    "rank": first_rank + i,
                    "score": hit.score,
                    "id": hit.chunk.id,
                    "file": hit.chunk.file,
                    "excerpt": excerpt,
                    "highlighted": engine.highlight(&excerpt, None),
                    "link": engine.deep_link(&hit.chunk),
                })
            })
            .collect();
        let out = json!({
            "query": page.query,
            "total": page.total,
            "page": page.page,
            "totalPages": page.total_pages,
            "elapsedMs": page.elapsed.as_secs_f64() * 1000.0,
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if page.total == 0 {
        println!("No results found.");
        return Ok(());
    }

    let color = !args.no_color && std::io::stdout().is_terminal();
    for (i, hit) in page.results.iter().enumerate() {
        println!(
            "{:>3}. [{}] {} {}",
            first_rank + i,
            hit.score,
            hit.chunk.file,
            engine.deep_link(&hit.chunk)
        );
        let excerpt = engine.excerpt(&hit.chunk.text, None, args.context_words);
        if color {
            let marked =
                text_util::highlight_with(&excerpt, &page.query, Marker::ANSI);
            println!("     {marked}");
        } else {
            println!("     {excerpt}");
        }
    }
    println!(
        "\n{} result(s), page {} of {}",
        page.total,
        page.page + 1,
        page.total_pages
    );
    Ok(())
}

fn cmd_info(engine: &SearchEngine, json: bool) -> Result<()> {
    let info = engine.info().ok_or_else(|| Error::NotFound {
        kind: "corpus",
        name: "(none loaded)".to_string(),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    if let Some(title) = &info.title {
        println!("Title: {title}");
    }
    if let Some(subtitle) = &info.subtitle {
        println!("Subtitle: {subtitle}");
    }
    if let Some(author) = &info.author {
        println!("Author: {author}");
    }
    if let Some(description) = &info.description {
        println!("Description: {description}");
    }
    println!("Works: {}", info.stats.works);
    println!("Chunks: {}", info.stats.chunks);
    println!("Words: {}", info.stats.words);
    if let Some(generated) = &info.generated {
        println!("Generated: {generated}");
    }
    Ok(())
}

fn cmd_works(engine: &SearchEngine, args: &cli::WorksArgs) -> Result<()> {
    let works: Vec<_> = engine
        .works()
        .into_iter()
        .filter(|w| match &args.category {
            Some(category) => w.category.as_ref() == Some(category),
            None => true,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&works)?);
    } else if works.is_empty() {
        println!("No works found.");
    } else {
        for work in &works {
            println!(
                "{}\t{}\t{}\t{} chunk(s)",
                work.key(),
                work.title,
                work.category.as_deref().unwrap_or("-"),
                work.chunk_count
            );
        }
    }
    Ok(())
}

fn cmd_get(engine: &SearchEngine, args: &cli::GetArgs) -> Result<()> {
    let (id, query) = match DeepLink::parse(&args.reference) {
        Some(link) => (link.id, link.query),
        None => (args.reference.clone(), None),
    };

    let chunk = engine.chunk_by_id(&id).ok_or_else(|| Error::NotFound {
        kind: "chunk",
        name: id.clone(),
    })?;
    let query = query.unwrap_or_default();

    if args.json {
        let out = json!({
            "chunk": chunk,
            "link": DeepLink::new(&chunk.id, &query).to_fragment(),
            "highlighted": engine.highlight(&chunk.text, Some(&query)),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("--- {} #{} ---", chunk.file, chunk.id);
    if !query.is_empty() && std::io::stdout().is_terminal() {
        println!(
            "{}",
            text_util::highlight_with(&chunk.text, &query, Marker::ANSI)
        );
    } else {
        println!("{}", chunk.text);
    }
    Ok(())
}
