//! Agora CLI
//!
//! The entry point for the marketplace client. Handles CLI args and
//! dispatches to the registration, catalog, negotiation, onboarding,
//! and task-tracking flows.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dialoguer::Input;
use tokio::signal;

use agora::catalog::{fetch_catalog, find_agent, onboard};
use agora::config::{load_config, normalize_platform_url, save_config};
use agora::identity::session;
use agora::identity::{FileIdentityProvider, IdentityProvider};
use agora::negotiation::controller::AgentIdentity;
use agora::negotiation::{
    LoadingTicker, Message, NegotiationController, NegotiationStatus, Sender,
};
use agora::platform::PlatformHttpClient;
use agora::tasks;
use agora::types::AgentListing;
use agora::ui::{
    prompt_password, prompt_required, prompt_wallet_address, show_banner,
};

const VERSION: &str = "0.1.0";

/// Agora -- AI Agent Marketplace Client
#[derive(Parser, Debug)]
#[command(
    name = "agora",
    version = VERSION,
    about = "Agora -- AI agent marketplace client",
    long_about = "Terminal client for the AI agent marketplace. Browse agents, negotiate \
                  terms, and fund contracts through the platform's Web3 escrow."
)]
struct Cli {
    /// Register a client account locally
    #[arg(long)]
    register: bool,

    /// Log in against the platform
    #[arg(long)]
    login: bool,

    /// Remove the stored session
    #[arg(long)]
    logout: bool,

    /// List the agent catalog
    #[arg(long)]
    agents: bool,

    /// Show one agent's detail view
    #[arg(long, value_name = "ID")]
    agent: Option<String>,

    /// Open a negotiation with an agent
    #[arg(long, value_name = "ID")]
    hire: Option<String>,

    /// Onboard a new agent into the local catalog
    #[arg(long)]
    onboard: bool,

    /// Show the task-tracking dashboard once
    #[arg(long)]
    tasks: bool,

    /// Track tasks with periodic refresh
    #[arg(long)]
    watch_tasks: bool,

    /// Show client status
    #[arg(long)]
    status: bool,

    /// Persist a platform base URL to the config file
    #[arg(long, value_name = "URL")]
    set_platform: Option<String>,
}

// ---- Registration & Login ---------------------------------------------------

fn run_register() -> Result<()> {
    show_banner();
    println!("{}", "  Join the AI Web3 marketplace.\n".white());

    let email = prompt_required("Email address")?;
    let wallet = prompt_wallet_address("Primary ETH wallet address")?;
    println!(
        "{}",
        "  Warning: never share your private key. It is stored locally, for demo use only."
            .yellow()
    );
    let private_key = prompt_password("Primary ETH wallet private key")?;

    session::save_registration(&email, &wallet, &private_key)?;
    println!();
    println!("{}", "Registration successful!".green());
    println!("{}", "Log in with: agora --login".dimmed());
    Ok(())
}

async fn run_login(platform: &PlatformHttpClient) -> Result<()> {
    show_banner();
    let email = prompt_required("Email address")?;
    let password = prompt_password("Password")?;

    let session = session::login(platform, &email, &password).await?;
    let identity = session::identity_from_session(&session)
        .context("Platform session carries no client identity")?;

    println!();
    println!(
        "{}",
        format!("Welcome back, {}!", identity.email_address).green()
    );
    Ok(())
}

// ---- Catalog ----------------------------------------------------------------

fn print_listing_card(agent: &AgentListing) {
    println!(
        "  {} {}  {}",
        agent.avatar,
        agent.name.bold().white(),
        format!("{:.1} ({} reviews)", agent.rating, agent.reviews).dimmed()
    );
    println!("     {}  {}", agent.company.dimmed(), agent.specialty.cyan());
    if !agent.description.is_empty() {
        println!("     {}", agent.description.dimmed());
    }
    println!("     {}", format!("id: {}", agent.id).dimmed());
    println!();
}

async fn run_agents(platform: &PlatformHttpClient) -> Result<()> {
    let fetched = fetch_catalog(platform, &onboard::list_onboarded()).await;
    println!();
    println!("{}", "AI Agent Marketplace".bold().white());
    if let Some(err) = &fetched.fetch_error {
        println!(
            "{}",
            format!("Error fetching agents: {err}. Showing built-in catalog.").yellow()
        );
    }
    println!();
    for agent in &fetched.agents {
        print_listing_card(agent);
    }
    println!("{}", "Hire with: agora --hire <ID>".dimmed());
    Ok(())
}

async fn run_agent_detail(platform: &PlatformHttpClient, id: &str) -> Result<()> {
    let fetched = fetch_catalog(platform, &onboard::list_onboarded()).await;
    let Some(agent) = find_agent(&fetched.agents, id) else {
        anyhow::bail!("Agent not found: {id}. List agents with: agora --agents");
    };

    println!();
    println!("  {} {}", agent.avatar, agent.name.bold().white());
    println!("  {}  {}", agent.company.dimmed(), agent.specialty.cyan());
    println!(
        "  {}",
        format!("{:.1} stars, {} reviews", agent.rating, agent.reviews).dimmed()
    );
    println!();
    if !agent.description.is_empty() {
        println!("  {}", agent.description.white());
        println!();
    }
    if !agent.capabilities.is_empty() {
        println!("  {}", "Capabilities:".bold().white());
        for cap in &agent.capabilities {
            println!("    - {cap}");
        }
        println!();
    }
    if let Some(range) = &agent.price_range {
        println!("  Price range:   {range}");
    }
    if let Some(time) = &agent.response_time {
        println!("  Response time: {time}");
    }
    println!();
    println!("{}", format!("Hire with: agora --hire {}", agent.id).dimmed());
    Ok(())
}

// ---- Negotiation ------------------------------------------------------------

fn print_message(msg: &Message) {
    match msg.sender {
        Sender::Client => println!("  {} {}", "you:".bold().blue(), msg.content),
        Sender::Agent => println!("  {} {}", "agent:".bold().magenta(), msg.content),
    }
}

async fn run_hire(platform: &PlatformHttpClient, id: &str) -> Result<()> {
    let fetched = fetch_catalog(platform, &onboard::list_onboarded()).await;
    let Some(listing) = find_agent(&fetched.agents, id) else {
        anyhow::bail!("Agent not found: {id}. List agents with: agora --agents");
    };

    let agent = AgentIdentity {
        display_name: listing.name.clone(),
        platform_username: listing.username.clone().unwrap_or_else(|| listing.id.clone()),
    };

    println!();
    println!(
        "{}",
        format!("Work with {}", agent.display_name).bold().white()
    );
    println!();

    let identity = FileIdentityProvider;
    let mut ctl = NegotiationController::new(platform, &identity, agent);

    // Details phase: re-prompt until the proposal validates.
    loop {
        let budget = prompt_required("Budget range (e.g. $100-500)")?;
        let requirements = prompt_required("Task requirements")?;
        let criteria = prompt_required("Success criteria")?;

        match ctl.submit_proposal(&budget, &requirements, &criteria).await {
            Ok(()) => break,
            Err(e) => println!("{}", format!("  {e}").yellow()),
        }
    }

    println!();
    println!(
        "{}",
        format!("Negotiating with {}", ctl.agent_name()).bold().white()
    );
    println!(
        "{}",
        "  Type a message, /finalize to close the deal, /quit to walk away.".dimmed()
    );
    println!();
    for msg in ctl.history() {
        print_message(msg);
    }

    let mut accept_announced = false;
    loop {
        if ctl.status() == NegotiationStatus::Accepted && !accept_announced {
            println!(
                "{}",
                "  The agent accepted your terms. Type /finalize to fund the contract.".green()
            );
            accept_announced = true;
        }

        let line: String = Input::new()
            .with_prompt(format!("  {} you", "\u{2192}".cyan()))
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim().to_string();

        match line.as_str() {
            "" => continue,
            "/quit" | "/exit" => {
                println!("{}", "  Negotiation abandoned.".dimmed());
                break;
            }
            "/finalize" => {
                let outcome = {
                    let _ticker =
                        (ctl.status() == NegotiationStatus::Accepted).then(LoadingTicker::start);
                    ctl.finalize_agreement().await
                };

                match outcome {
                    Ok(contract) => {
                        println!();
                        println!("{}", "Agreement finalized!".bold().green());
                        println!("  {}", contract.message.white());
                        println!("  Task ID:    {}", contract.task_id);
                        println!("  Contract:   {}", contract.contract_address);
                        println!("  Task price: {}", contract.task_price);
                        break;
                    }
                    Err(e) => {
                        println!("{}", format!("  {e}").red());
                        // Back in negotiation; the client may retry.
                    }
                }
            }
            text => {
                if let Err(e) = ctl.send_message(text).await {
                    println!("{}", format!("  {e}").red());
                    continue;
                }
                if let Some(reply) = ctl.last_message() {
                    print_message(reply);
                }
            }
        }
    }

    Ok(())
}

// ---- Onboarding -------------------------------------------------------------

fn run_onboard() -> Result<()> {
    show_banner();
    println!("{}", "  Onboard your AI agent.\n".white());

    let name = prompt_required("Agent name")?;
    let company = prompt_required("Company")?;
    let specialty = prompt_required("Specialty")?;
    let description = prompt_required("Description")?;
    let webhook_url = prompt_required("Webhook URL")?;
    let api_key = prompt_password("API key")?;

    let agent = onboard::new_agent(
        &name,
        &company,
        &specialty,
        &description,
        &webhook_url,
        &api_key,
    )?;
    onboard::save_onboarded(&agent)?;

    println!();
    println!("{}", "Agent onboarded successfully!".green());
    println!(
        "{}",
        format!("{} has been added to the local catalog.", agent.name).dimmed()
    );
    Ok(())
}

// ---- Tasks ------------------------------------------------------------------

fn require_email() -> Result<String> {
    let identity = FileIdentityProvider
        .client_identity()
        .context("Not logged in. Log in with: agora --login")?;
    Ok(identity.email_address)
}

// ---- Status -----------------------------------------------------------------

fn show_status(platform_url: &str) {
    let identity = FileIdentityProvider.client_identity();
    let registered = session::load_registration().is_some();
    let onboarded = onboard::list_onboarded().len();

    println!(
        r#"
=== AGORA STATUS ===
Platform:   {}
Registered: {}
Logged in:  {}
Onboarded:  {} agent(s)
Version:    {}
====================
"#,
        platform_url,
        if registered { "yes" } else { "no" },
        identity
            .map(|i| i.email_address)
            .unwrap_or_else(|| "no".to_string()),
        onboarded,
        VERSION,
    );
}

// ---- Entry Point ------------------------------------------------------------

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config();
    let platform = PlatformHttpClient::new(config.platform_url.clone());

    let result: Result<()> = if cli.register {
        run_register()
    } else if cli.login {
        run_login(&platform).await
    } else if cli.logout {
        session::clear_session().map(|_| println!("{}", "Logged out.".green()))
    } else if cli.agents {
        run_agents(&platform).await
    } else if let Some(id) = cli.agent.as_deref() {
        run_agent_detail(&platform, id).await
    } else if let Some(id) = cli.hire.as_deref() {
        run_hire(&platform, id).await
    } else if cli.onboard {
        run_onboard()
    } else if cli.tasks {
        match require_email() {
            Ok(email) => {
                tasks::show_tasks(&platform, &email).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    } else if cli.watch_tasks {
        match require_email() {
            Ok(email) => {
                let interval = std::time::Duration::from_secs(config.poll_interval_secs);
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        println!();
                        println!("{}", "Stopped.".dimmed());
                    }
                    _ = tasks::watch_tasks(&platform, &email, interval) => {}
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    } else if let Some(url) = cli.set_platform.as_deref() {
        let mut config = config.clone();
        config.platform_url = normalize_platform_url(url);
        save_config(&config).map(|_| {
            println!(
                "{}",
                format!("Platform set to {}.", config.platform_url).green()
            )
        })
    } else if cli.status {
        show_status(&config.platform_url);
        Ok(())
    } else {
        show_banner();
        println!("{}", "  Commands:".white());
        println!("    --register        register a client account");
        println!("    --login           log in to the marketplace");
        println!("    --agents          browse the agent catalog");
        println!("    --agent <ID>      show an agent's details");
        println!("    --hire <ID>       negotiate and fund a contract");
        println!("    --onboard         onboard your own agent");
        println!("    --tasks           track your tasks");
        println!("    --watch-tasks     track tasks with auto-refresh");
        println!("    --status          show client status");
        println!("    --set-platform <URL>  point the client at another platform");
        println!();
        Ok(())
    };

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {e:#}").red());
        std::process::exit(1);
    }
}
