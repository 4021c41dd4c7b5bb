//! Terminal front end: API key prompt, toasts and the interactive shell.

use std::io::Write;

use anyhow::{anyhow, bail, Result};
use client_core::{
    render::{render_customers, render_query_result},
    ClientError, ControllerEvent, Notification, Session,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::broadcast::{self, error::TryRecvError},
};

const SHELL_HELP: &str = "\
Commands:
  :query, :q       switch to the query page
  :customers, :c   switch to the customers page and load the list
  :refresh, :r     reload the customer list
  :key             enter a new API key
  :help            show this help
  :quit            exit
On the query page, any other input is submitted as a question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Query,
    Customers,
}

pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }

    /// Blocks until a usable API key is stored.
    pub async fn ensure_credential(&mut self, session: &Session) -> Result<()> {
        if !session.needs_credential().await {
            return Ok(());
        }
        println!("API Key Setup: please enter your API key to continue.");
        loop {
            let Some(line) = self.read_line("API key: ").await? else {
                bail!("an API key is required");
            };
            match session.provide_credential(&line).await {
                Ok(()) => {
                    println!("API key saved.");
                    return Ok(());
                }
                Err(ClientError::Validation(message)) => eprintln!("{message}"),
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn set_key(&mut self, session: &Session, token: Option<String>) -> Result<()> {
        let token = match token {
            Some(token) => token,
            None => self
                .read_line("API key: ")
                .await?
                .ok_or_else(|| anyhow!("no API key entered"))?,
        };
        session.provide_credential(&token).await?;
        println!("API key saved.");
        Ok(())
    }

    pub async fn shell(&mut self, session: &Session) -> Result<()> {
        let mut events = session.subscribe();
        let mut page = Page::Query;
        println!("{SHELL_HELP}");

        loop {
            self.ensure_credential(session).await?;
            let prompt = match page {
                Page::Query => "query> ",
                Page::Customers => "customers> ",
            };
            let Some(line) = self.read_line(prompt).await? else {
                return Ok(());
            };
            let input = line.trim();

            match input {
                "" => continue,
                ":quit" | ":exit" => return Ok(()),
                ":help" => println!("{SHELL_HELP}"),
                ":key" => self.set_key(session, None).await?,
                ":query" | ":q" => page = Page::Query,
                ":customers" | ":c" | ":refresh" | ":r" => {
                    page = Page::Customers;
                    run_customers(session, &mut events).await;
                }
                _ if input.starts_with(':') => println!("unknown command '{input}' (try :help)"),
                question => match page {
                    Page::Query => {
                        run_query(session, question, &mut events).await;
                    }
                    Page::Customers => {
                        println!("switch to the query page with :q to ask questions");
                    }
                },
            }
        }
    }
}

/// Submits one question and prints the outcome. Returns whether it succeeded.
pub async fn run_query(
    session: &Session,
    question: &str,
    events: &mut broadcast::Receiver<ControllerEvent>,
) -> bool {
    let handle = match session.query().submit(question).await {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("Error: {err}");
            return false;
        }
    };
    println!("Processing...");
    if let Err(err) = handle.await {
        eprintln!("Error: query task aborted: {err}");
        return false;
    }

    let state = session.query().state().await;
    if let Some(result) = state.displayed() {
        print!("{}", render_query_result(result));
    }
    print_notifications(events);
    state.error_message().is_none()
}

pub async fn run_customers(
    session: &Session,
    events: &mut broadcast::Receiver<ControllerEvent>,
) -> bool {
    let Some(handle) = session.customers().refresh().await else {
        println!("Refreshing...");
        return true;
    };
    if let Err(err) = handle.await {
        eprintln!("Error: customer task aborted: {err}");
        return false;
    }

    let state = session.customers().state().await;
    print!("{}", render_customers(&state));
    print_notifications(events);
    !matches!(state.phase, client_core::LoadPhase::Failed(_))
}

/// Drains the notifications queued on `events` without waiting.
pub fn take_notifications(events: &mut broadcast::Receiver<ControllerEvent>) -> Vec<Notification> {
    let mut pending = Vec::new();
    loop {
        match events.try_recv() {
            Ok(ControllerEvent::Notify(notification)) => pending.push(notification),
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    pending
}

/// Prints pending notifications the way a toast area would.
pub fn print_notifications(events: &mut broadcast::Receiver<ControllerEvent>) {
    for notification in take_notifications(events) {
        eprintln!("{notification}");
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
