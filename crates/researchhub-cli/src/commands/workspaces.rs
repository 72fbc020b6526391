use anyhow::Result;
use clap::Subcommand;

use researchhub_core::board::{WorkspaceBoard, WorkspaceLibrary};
use researchhub_core::utils::{format_date, format_optional, truncate_string};

use super::App;

#[derive(Subcommand)]
pub enum WorkspaceAction {
    /// List your workspaces
    List,
    /// Create a workspace
    Create {
        name: String,
        #[arg(long, short, default_value = "")]
        description: String,
    },
    /// Show a workspace and its papers
    Show { id: i64 },
    /// Delete a workspace and everything in it
    Delete { id: i64 },
}

pub async fn run(app: &App, action: WorkspaceAction) -> Result<()> {
    app.require_user()?;
    let api = app.api().clone();

    match action {
        WorkspaceAction::List => {
            let mut board = WorkspaceBoard::new(api);
            let workspaces = board.refresh().await?;
            if workspaces.is_empty() {
                println!("No workspaces yet. Create one with `researchhub workspaces create <name>`.");
            }
            for ws in workspaces {
                println!(
                    "{:>6}  {:<40}  {}",
                    ws.id,
                    truncate_string(&ws.name, 40),
                    ws.display_paper_count()
                );
            }
        }
        WorkspaceAction::Create { name, description } => {
            let mut board = WorkspaceBoard::new(api);
            let ws = board.create(&name, &description).await?;
            println!("Created workspace {} ({}).", ws.name, ws.id);
        }
        WorkspaceAction::Show { id } => {
            let library = WorkspaceLibrary::load(api, id).await?;
            let ws = library.workspace();
            println!("{} ({})", ws.name, ws.display_paper_count());
            if !ws.description.is_empty() {
                println!("{}", ws.description);
            }
            println!("Created {}", format_date(&ws.created_at));
            println!();
            for paper in library.papers() {
                let year = paper.year.map(|y| y.to_string());
                println!(
                    "{:>6}  {}  [{}]",
                    paper.id,
                    truncate_string(&paper.title, 70),
                    format_optional(year.as_deref(), "n.d.")
                );
                println!("        {}", truncate_string(&paper.authors, 70));
            }
        }
        WorkspaceAction::Delete { id } => {
            let mut board = WorkspaceBoard::new(api);
            board.refresh().await?;
            board.delete(id).await?;
            println!("Deleted workspace {}.", id);
        }
    }
    Ok(())
}
