use anyhow::{anyhow, Result};
use clap::Subcommand;

use researchhub_core::board::ChatThread;
use researchhub_core::utils::{format_date, truncate_string};

use super::{prompt_line, App};

#[derive(Subcommand)]
pub enum ChatAction {
    /// Send one message and print the reply
    Send {
        workspace: i64,
        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<i64>,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// List a workspace's conversations
    History { workspace: i64 },
    /// Delete a conversation
    Delete { conversation: i64 },
    /// Interactive chat. `/new` starts a fresh conversation, `/quit` exits.
    Repl {
        workspace: i64,
        #[arg(long)]
        conversation: Option<i64>,
    },
}

async fn open_thread(app: &App, workspace: i64, conversation: Option<i64>) -> Result<ChatThread> {
    let mut thread = ChatThread::new(app.api().clone(), workspace);
    if let Some(id) = conversation {
        let found = thread
            .history()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("Conversation {} not found in workspace {}", id, workspace))?;
        thread.open(found);
    }
    Ok(thread)
}

pub async fn run(app: &App, action: ChatAction) -> Result<()> {
    app.require_user()?;

    match action {
        ChatAction::Send {
            workspace,
            conversation,
            message,
        } => {
            let mut thread = open_thread(app, workspace, conversation).await?;
            let reply = thread.send(&message.join(" ")).await?;
            println!("{}", reply.content);
            if let Some(id) = thread.conversation_id() {
                println!("\n(conversation {})", id);
            }
        }
        ChatAction::History { workspace } => {
            let conversations = app.api().chat_history(workspace).await?;
            if conversations.is_empty() {
                println!("No conversations yet.");
            }
            for conv in conversations {
                println!(
                    "{:>6}  {}  {}  ({} messages)",
                    conv.id,
                    format_date(&conv.created_at),
                    truncate_string(&conv.title, 50),
                    conv.messages.len()
                );
            }
        }
        ChatAction::Delete { conversation } => {
            app.api().delete_conversation(conversation).await?;
            println!("Deleted conversation {}.", conversation);
        }
        ChatAction::Repl {
            workspace,
            conversation,
        } => {
            let mut thread = open_thread(app, workspace, conversation).await?;
            for message in thread.messages() {
                println!("{}: {}", message.role, message.content);
            }
            while let Some(line) = prompt_line("> ")? {
                match line.as_str() {
                    "" => continue,
                    "/quit" | "/exit" => break,
                    "/new" => {
                        thread.new_chat();
                        println!("Started a new conversation.");
                    }
                    text => match thread.send(text).await {
                        Ok(reply) => println!("{}: {}", reply.role, reply.content),
                        Err(e) if e.is_unauthorized() => return Err(e.into()),
                        Err(_) => {
                            if let Some(notice) = thread.messages().last() {
                                println!("{}: {}", notice.role, notice.content);
                            }
                        }
                    },
                }
            }
        }
    }
    Ok(())
}
