//! Interactive analyst chat example
//!
//! This example demonstrates an AnalystSession bound to the database named by
//! DATABASE_URL. Follow-up questions ("break those down by gender") carry the
//! previous turn's topic automatically.
//!
//! Requires OPENAI_API_KEY and DATABASE_URL in the environment (or a .env
//! file); LLM_BASE_URL optionally points at a compatible endpoint.
//!
//! Run with: cargo run --example analyst_chat

use std::io::{self, Write};
use tabletalk::analyst::AnalystSession;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut session = AnalystSession::builder("demo-user").debug_mode(true).build()?;

    println!("Analyst Chat Example");
    println!("====================");
    println!("Session: {}", session.session_id());
    println!("Ask about the data; send an empty message to exit.\n");

    loop {
        // Get user input
        print!("You: ");
        io::stdout().flush()?;

        let mut question = String::new();
        io::stdin().read_line(&mut question)?;
        let question = question.trim();

        // Exit on empty input
        if question.is_empty() {
            println!("\nGoodbye!");
            break;
        }

        print!("Analyst: ");
        io::stdout().flush()?;

        match session.ask(question).await {
            Ok(response) => {
                println!("{}\n", response);
            }
            Err(e) => {
                eprintln!("Error: {}\n", e);
            }
        }

        if !session.last_query_context().is_empty() {
            println!("(Carrying context: {})\n", session.last_query_context());
        }
    }

    Ok(())
}
