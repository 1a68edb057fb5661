//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod clear;
pub mod embed;
pub mod fulltext;
pub mod import;
pub mod library;
pub mod mcp;
pub mod read;
pub mod rebuild;
pub mod related;
pub mod search;
pub mod semantic;
pub mod show;
pub mod stats;

use crate::app::AppContext;
use crate::error::Result;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Import(args) => import::run(ctx, args),
        Commands::Embed(args) => embed::run(ctx, args),
        Commands::Search(args) => search::run(ctx, args),
        Commands::Fulltext(args) => fulltext::run(ctx, args),
        Commands::Library(args) => library::run(ctx, args),
        Commands::Semantic(args) => semantic::run(ctx, args),
        Commands::Related(args) => related::run(ctx, args),
        Commands::Show(args) => show::run(ctx, args),
        Commands::Read(args) => read::run(ctx, args),
        Commands::Stats => stats::run(ctx),
        Commands::Rebuild => rebuild::run(ctx),
        Commands::Clear(args) => clear::run(ctx, args),
        Commands::Mcp(args) => mcp::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import references and page text from a JSON export
    Import(import::ImportArgs),

    /// Compute embeddings for references that lack one
    Embed(embed::EmbedArgs),

    /// Search titles, authors, abstracts, keywords and journals
    Search(search::SearchArgs),

    /// Search the extracted page text of attached documents
    Fulltext(fulltext::FulltextArgs),

    /// Search metadata and page text together
    Library(library::LibraryArgs),

    /// Search by meaning using stored embeddings
    Semantic(semantic::SemanticArgs),

    /// Find references related to a given one
    Related(related::RelatedArgs),

    /// Show full details for one or more references
    Show(show::ShowArgs),

    /// Print stored page text of a reference's document
    Read(read::ReadArgs),

    /// Show library statistics
    Stats,

    /// Rebuild the lexical indexes from stored rows
    Rebuild,

    /// Delete every reference, page and embedding
    Clear(clear::ClearArgs),

    /// MCP server for tool-calling agents
    Mcp(mcp::McpArgs),
}
