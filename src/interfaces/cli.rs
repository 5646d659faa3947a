use crate::application::chat::ChatService;
use crate::application::gateway::PaymentGateway;
use crate::application::ledger::{AdminPatch, OrderLedger};
use crate::application::notify::Notifier;
use crate::application::reconcile::{ReconcileOutcome, Reconciler};
use crate::config::AppConfig;
use crate::domain::gateway::GatewayStatus;
use crate::domain::order::{Order, OrderStatus, PaymentLeg};
use crate::domain::ports::{
    ChatStoreRef, OrderStoreRef, PaymentProcessorRef, PortfolioStoreRef, SessionStoreRef,
};
use crate::domain::pricing::ServiceConfig;
use crate::error::{OrderError, Result};
use crate::infrastructure::state_file::FileState;
use crate::interfaces::webhook::{self, WebhookNotification};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(author, version, about = "Order ledger and payment reconciliation for the studio")]
pub struct Cli {
    /// Path to the JSON state file
    #[arg(long, default_value = "atelier-state.json")]
    pub state: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage orders
    #[command(subcommand)]
    Order(OrderCmd),
    /// Start or refresh payments
    #[command(subcommand)]
    Pay(PayCmd),
    /// Control the sandbox gateway
    #[command(subcommand)]
    Gateway(GatewayCmd),
    /// Ingest a processor webhook payload from a JSON file (always acks)
    Webhook { payload: PathBuf },
    /// Customer/admin messaging
    #[command(subcommand)]
    Chat(ChatCmd),
    /// List queued notification emails
    Outbox,
    /// List published portfolio entries
    Portfolio,
}

#[derive(Subcommand)]
pub enum OrderCmd {
    /// Create a priced order
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        service: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
    },
    /// Create a consultation (no payment phase)
    Consult {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Price a calculator configuration (JSON)
    Quote {
        #[arg(long)]
        config: String,
    },
    List,
    Show {
        number: u64,
    },
    /// Admin field patch
    Update {
        number: u64,
        #[arg(long)]
        status: Option<OrderStatus>,
        #[arg(long)]
        progress: Option<u8>,
        #[arg(long)]
        chat: Option<bool>,
    },
    /// Record an uploaded artifact URL against the order
    Attach {
        number: u64,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        label: String,
        /// Store as a delivered result file instead of production evidence
        #[arg(long)]
        result: bool,
    },
    Delete {
        number: u64,
    },
}

#[derive(Subcommand)]
pub enum PayCmd {
    /// Create a payment session for one leg
    Start {
        number: u64,
        #[arg(long)]
        leg: PaymentLeg,
    },
    /// Refresh payment state from the gateway (pull path)
    Sync { number: u64 },
}

#[derive(Subcommand)]
pub enum GatewayCmd {
    /// Mark a sandbox session settled
    Settle { session_id: String },
    /// Mark a sandbox session denied
    Deny { session_id: String },
    /// Mark a sandbox session expired
    Expire { session_id: String },
    /// Emit the signed webhook for a sandbox session (push path)
    Notify { session_id: String },
}

#[derive(Subcommand)]
pub enum ChatCmd {
    /// Send a message as the customer, authenticated by the order token
    Send { token: String, body: String },
    /// Send a message as the admin
    Reply { number: u64, body: String },
    /// Print the message log for an order
    Log { number: u64 },
}

struct Services {
    state: Arc<FileState>,
    config: AppConfig,
    ledger: OrderLedger,
    gateway: PaymentGateway,
    reconciler: Arc<Reconciler>,
    chat: ChatService,
    orders: OrderStoreRef,
}

fn wire(state: Arc<FileState>, config: AppConfig) -> Services {
    let orders: OrderStoreRef = state.clone();
    let sessions: SessionStoreRef = state.clone();
    let messages: ChatStoreRef = state.clone();
    let portfolio: PortfolioStoreRef = state.clone();
    let processor: PaymentProcessorRef = state.clone();

    let notifier = Arc::new(Notifier::new(state.clone(), config.admin_email.clone()));
    let reconciler = Arc::new(Reconciler::new(
        orders.clone(),
        portfolio.clone(),
        notifier.clone(),
    ));
    let ledger = OrderLedger::new(orders.clone(), portfolio, notifier.clone());
    let gateway = PaymentGateway::new(processor, orders.clone(), sessions, reconciler.clone());
    let chat = ChatService::new(orders.clone(), messages, notifier);

    Services {
        state,
        config,
        ledger,
        gateway,
        reconciler,
        chat,
        orders,
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let state = FileState::load(&cli.state).await?;
    let services = wire(state, AppConfig::from_env());

    let mut out = Vec::new();
    execute(&services, cli.command, &mut out).await?;
    // Output is withheld until the state file is flushed, so a caller never
    // holds a session id or order number the file does not know about.
    services.state.save().await?;
    for line in out {
        println!("{line}");
    }
    Ok(())
}

async fn execute(services: &Services, command: Command, out: &mut Vec<String>) -> Result<()> {
    match command {
        Command::Order(cmd) => order_command(services, cmd, out).await,
        Command::Pay(cmd) => pay_command(services, cmd, out).await,
        Command::Gateway(cmd) => gateway_command(services, cmd, out).await,
        Command::Webhook { payload } => {
            let raw = tokio::fs::read_to_string(&payload).await?;
            ack_webhook(services, &raw, out).await;
            Ok(())
        }
        Command::Chat(cmd) => chat_command(services, cmd, out).await,
        Command::Outbox => {
            for email in services.state.outbox().await {
                out.push(format!("{} | {}", email.to, email.subject));
            }
            Ok(())
        }
        Command::Portfolio => {
            for entry in services.state.portfolio_entries().await {
                out.push(format!("{} | {}", entry.key, entry.title));
            }
            Ok(())
        }
    }
}

async fn order_command(services: &Services, cmd: OrderCmd, out: &mut Vec<String>) -> Result<()> {
    match cmd {
        OrderCmd::Create {
            name,
            email,
            service,
            description,
            amount,
        } => {
            let order = services
                .ledger
                .create_order(&name, &email, &service, &description, amount)
                .await?;
            out.push(format!("created order {} token={}", order.number, order.token));
        }
        OrderCmd::Consult {
            name,
            email,
            description,
        } => {
            let order = services
                .ledger
                .create_consultation(&name, &email, &description)
                .await?;
            out.push(format!(
                "created consultation {} token={}",
                order.number, order.token
            ));
        }
        OrderCmd::Quote { config } => {
            let config: ServiceConfig = serde_json::from_str(&config)?;
            let quoted = crate::domain::pricing::quote(&config);
            out.push(format!("quote: {quoted}"));
        }
        OrderCmd::List => {
            for order in services.ledger.list().await? {
                out.push(summary(&order));
            }
        }
        OrderCmd::Show { number } => {
            let order = require(services, number).await?;
            out.push(summary(&order));
            out.push(format!(
                "  customer: {} <{}>",
                order.customer_name, order.customer_email
            ));
            out.push(format!(
                "  amounts: gross={} down={} final={}",
                order.gross, order.down_payment, order.final_payment
            ));
            out.push(format!("  progress: {}%", order.progress));
            out.push(format!("  token: {}", order.token));
            match &order.gateway_session_id {
                Some(session_id) => out.push(format!("  session: {session_id}")),
                None => out.push("  session: none".to_string()),
            }
            for link in &order.evidence_links {
                out.push(format!("  evidence: {} ({})", link.url, link.label));
            }
            for file in &order.result_files {
                out.push(format!("  result: {} ({})", file.url, file.label));
            }
        }
        OrderCmd::Update {
            number,
            status,
            progress,
            chat,
        } => {
            let order = require(services, number).await?;
            let patch = AdminPatch {
                status,
                progress,
                chat_enabled: chat,
            };
            let order = services.ledger.apply_admin_update(order.id, patch).await?;
            out.push(summary(&order));
        }
        OrderCmd::Attach {
            number,
            url,
            label,
            result,
        } => {
            let order = require(services, number).await?;
            let order = if result {
                services.ledger.append_result(order.id, &url, &label).await?
            } else {
                services.ledger.append_evidence(order.id, &url, &label).await?
            };
            out.push(format!(
                "attached to order {} ({} evidence, {} results)",
                order.number,
                order.evidence_links.len(),
                order.result_files.len()
            ));
        }
        OrderCmd::Delete { number } => {
            let order = require(services, number).await?;
            services.ledger.delete_order(order.id).await?;
            out.push(format!("deleted order {number}"));
        }
    }
    Ok(())
}

async fn pay_command(services: &Services, cmd: PayCmd, out: &mut Vec<String>) -> Result<()> {
    match cmd {
        PayCmd::Start { number, leg } => {
            let checkout = services.gateway.start_payment(number, leg).await?;
            out.push(format!("session {}", checkout.session_id));
            match checkout.redirect_url {
                Some(url) => out.push(format!("redirect {url}")),
                None => out.push("settled without gateway (zero amount)".to_string()),
            }
        }
        PayCmd::Sync { number } => {
            let outcome = services.gateway.sync(number).await?;
            out.push(format!("sync result: {}", describe(outcome)));
        }
    }
    Ok(())
}

async fn gateway_command(services: &Services, cmd: GatewayCmd, out: &mut Vec<String>) -> Result<()> {
    match cmd {
        GatewayCmd::Settle { session_id } => {
            services
                .state
                .sandbox_set(&session_id, GatewayStatus::Settlement, None)
                .await?;
            out.push(format!("sandbox session {session_id} -> settlement"));
        }
        GatewayCmd::Deny { session_id } => {
            services
                .state
                .sandbox_set(&session_id, GatewayStatus::Deny, None)
                .await?;
            out.push(format!("sandbox session {session_id} -> deny"));
        }
        GatewayCmd::Expire { session_id } => {
            services
                .state
                .sandbox_set(&session_id, GatewayStatus::Expire, None)
                .await?;
            out.push(format!("sandbox session {session_id} -> expire"));
        }
        GatewayCmd::Notify { session_id } => {
            let tx = services.state.sandbox_get(&session_id).await?;
            let gross_amount = tx.amount.to_string();
            let signature = WebhookNotification::sign(
                &session_id,
                "200",
                &gross_amount,
                &services.config.gateway.server_key,
            );
            let payload = serde_json::to_string(&WebhookNotification {
                order_id: session_id,
                status_code: "200".to_string(),
                gross_amount,
                signature_key: signature,
                transaction_status: tx.status,
                fraud_status: tx.fraud,
            })?;
            ack_webhook(services, &payload, out).await;
        }
    }
    Ok(())
}

/// The processor must always get an acknowledgement when its payload cannot
/// be processed; those failures go to the operator log and stay recoverable
/// through `pay sync`. Only a failure to persist state withholds the ack, so
/// the processor redelivers.
async fn ack_webhook(services: &Services, payload: &str, out: &mut Vec<String>) {
    match webhook::ingest(
        &services.reconciler,
        &services.config.gateway.server_key,
        payload,
    )
    .await
    {
        Ok(outcome) => out.push(format!("ack ({})", describe(outcome))),
        Err(err) => {
            error!(%err, "webhook processing failed; acknowledged anyway");
            out.push("ack".to_string());
        }
    }
}

async fn chat_command(services: &Services, cmd: ChatCmd, out: &mut Vec<String>) -> Result<()> {
    match cmd {
        ChatCmd::Send { token, body } => {
            services.chat.send_as_customer(&token, &body).await?;
            out.push("message sent".to_string());
        }
        ChatCmd::Reply { number, body } => {
            let order = require(services, number).await?;
            services.chat.send_as_admin(order.id, &body).await?;
            out.push("message sent".to_string());
        }
        ChatCmd::Log { number } => {
            let order = require(services, number).await?;
            for message in services.chat.history(order.id).await? {
                out.push(format!("[{}] {}", message.sender, message.body));
            }
        }
    }
    Ok(())
}

async fn require(services: &Services, number: u64) -> Result<Order> {
    services
        .orders
        .get_by_number(number)
        .await?
        .ok_or_else(|| OrderError::NotFound(format!("order #{number}")))
}

fn summary(order: &Order) -> String {
    format!(
        "#{} {} status={} down={} final={} progress={}% chat={}",
        order.number,
        order.service,
        order.status,
        order.down_payment_status,
        order.final_payment_status,
        order.progress,
        if order.chat_enabled { "on" } else { "off" }
    )
}

fn describe(outcome: ReconcileOutcome) -> String {
    match outcome {
        ReconcileOutcome::Applied(status) => format!("applied -> {status}"),
        ReconcileOutcome::NoChange(status) => format!("no change ({status})"),
    }
}
