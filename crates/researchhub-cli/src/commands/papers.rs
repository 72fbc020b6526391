use anyhow::Result;
use clap::Subcommand;
use tracing::warn;

use researchhub_core::api::DEFAULT_SEARCH_LIMIT;
use researchhub_core::board::{ImportOutcome, SearchSession, WorkspaceLibrary};
use researchhub_core::utils::{format_optional, truncate_string};

use super::App;

#[derive(Subcommand)]
pub enum PaperAction {
    /// Search the catalogue, optionally importing results into a workspace
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
        /// Workspace to import into
        #[arg(long)]
        workspace: Option<i64>,
        /// Result numbers to import, e.g. `--import 1,3`
        #[arg(long, value_delimiter = ',', requires = "workspace")]
        import: Vec<usize>,
    },
    /// List the papers in a workspace
    List { workspace: i64 },
    /// Remove a paper from a workspace
    Delete { workspace: i64, paper: i64 },
}

pub async fn run(app: &App, action: PaperAction) -> Result<()> {
    app.require_user()?;
    let api = app.api().clone();

    match action {
        PaperAction::Search {
            query,
            limit,
            workspace,
            import,
        } => {
            let mut search = SearchSession::new(api);
            let results = search.search(&query.join(" "), limit).await?.to_vec();
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (n, result) in results.iter().enumerate() {
                let year = result.year.map(|y| y.to_string());
                println!(
                    "{:>3}. {} [{}]",
                    n + 1,
                    truncate_string(&result.title, 70),
                    format_optional(year.as_deref(), "n.d.")
                );
                println!("     {}", truncate_string(&result.authors, 70));
            }

            let Some(workspace_id) = workspace else {
                return Ok(());
            };
            for n in import {
                let Some(result) = n.checked_sub(1).and_then(|i| results.get(i)) else {
                    warn!(n, "No such search result");
                    eprintln!("No result #{}.", n);
                    continue;
                };
                match search.import(workspace_id, result).await? {
                    ImportOutcome::Imported(paper) => {
                        println!("Imported #{} as paper {}.", n, paper.id)
                    }
                    ImportOutcome::AlreadyPresent => println!("#{} is already in the workspace.", n),
                }
            }
        }
        PaperAction::List { workspace } => {
            let papers = api.list_papers(workspace).await?;
            if papers.is_empty() {
                println!("No papers in this workspace.");
            }
            for paper in papers {
                let doi = format_optional(paper.doi.as_deref(), "-");
                println!(
                    "{:>6}  {}  doi:{}",
                    paper.id,
                    truncate_string(&paper.title, 70),
                    doi
                );
            }
        }
        PaperAction::Delete { workspace, paper } => {
            let mut library = WorkspaceLibrary::load(api, workspace).await?;
            library.delete_paper(paper).await?;
            println!(
                "Removed paper {}. {} now has {}.",
                paper,
                library.workspace().name,
                library.workspace().display_paper_count()
            );
        }
    }
    Ok(())
}
