use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "lectern",
    about = "Search chunked document corpora from the terminal"
)]
pub struct Cli {
    /// Results per page (overrides LECTERN_PAGE_SIZE)
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search a corpus
    Search(SearchArgs),
    /// Show corpus metadata
    Info(InfoArgs),
    /// List the works in a corpus
    Works(WorksArgs),
    /// List the category tags used by a corpus
    Categories(CategoriesArgs),
    /// Print one chunk by id or deep link
    Get(GetArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Corpus URL or path
    pub corpus: String,

    /// The search query: terms, "quoted phrases" and -exclusions
    #[arg(default_value = "", allow_hyphen_values = true)]
    pub query: String,

    /// Only search this work (by file key)
    #[arg(short = 'w', long)]
    pub work: Option<String>,

    /// Only search works tagged with this category
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Page to show (1-based)
    #[arg(short = 'p', long, default_value = "1")]
    pub page: u64,

    /// Words of context on each side of the first match
    #[arg(long)]
    pub context_words: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Disable highlighting in terminal output
    #[arg(long)]
    pub no_color: bool,
}

// -- Info --

#[derive(Debug, Parser)]
pub struct InfoArgs {
    /// Corpus URL or path
    pub corpus: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Works --

#[derive(Debug, Parser)]
pub struct WorksArgs {
    /// Corpus URL or path
    pub corpus: String,

    /// Only list works tagged with this category
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Categories --

#[derive(Debug, Parser)]
pub struct CategoriesArgs {
    /// Corpus URL or path
    pub corpus: String,
}

// -- Get --

#[derive(Debug, Parser)]
pub struct GetArgs {
    /// Corpus URL or path
    pub corpus: String,

    /// Chunk id, or a deep link such as "?id=42&q=lord"
    pub reference: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "lectern",
            &mut std::io::stdout(),
        );
    }
}
