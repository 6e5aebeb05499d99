use anyhow::{Context, Result};
use clap::Parser;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use pullsecrets::{
    cluster::{Cluster, DryRun, KubeCluster},
    config::{ProjectConfig, ReconcileConfig},
    credentials::DockerConfigProvider,
    identity::IdentityOutcome,
    reconcile::{ReconcileReport, Reconciler, SkipReason},
};
use std::{path::PathBuf, time::Duration};

/// Ensure registry pull secrets of project images exist in the cluster
#[derive(Parser)]
#[command(version, author = "Lach")]
struct Opts {
    /// Project file with images and deployments
    #[arg(long, short, default_value = "pullsecrets.yaml")]
    config: PathBuf,
    /// Kube context to use instead of current one
    #[arg(long)]
    context: Option<String>,
    /// Active namespace, defaults to namespace of kube context
    #[arg(long, short)]
    namespace: Option<String>,
    /// Service account which receives pull secrets
    #[arg(long, default_value = pullsecrets::config::DEFAULT_IDENTITY_NAME)]
    service_account: String,
    /// Contact email for registry auth entries
    #[arg(long, default_value = pullsecrets::config::DEFAULT_EMAIL)]
    email: String,
    /// Never call docker credential helpers
    #[arg(long)]
    non_interactive: bool,
    /// Service account update attempts on conflicts, 0 for unlimited
    #[arg(long, default_value_t = 10)]
    max_conflict_retries: u32,
    /// Initial delay between conflicting updates, in milliseconds
    #[arg(long, default_value_t = 50)]
    conflict_backoff_ms: u64,
    /// Print what would be changed without writing anything
    #[arg(long)]
    dry_run: bool,
}

async fn client(context: Option<String>) -> Result<Client> {
    let config = match context {
        Some(context) => {
            let kubeconfig = Kubeconfig::read().context("failed to read kubeconfig")?;
            Config::from_custom_kubeconfig(
                kubeconfig,
                &KubeConfigOptions {
                    context: Some(context.clone()),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("failed to load kube context {}", context))?
        }
        None => Config::infer().await.context("failed to infer kube config")?,
    };
    Ok(Client::try_from(config)?)
}

fn print_report(report: &ReconcileReport) {
    for secret in &report.secrets {
        log::info!(
            "Pull secret {}/{} for {}",
            secret.namespace,
            secret.name,
            secret.host
        );
    }
    for skipped in &report.skipped {
        let reason = match skipped.reason {
            SkipReason::NoCredentials => "no credentials found",
            SkipReason::NoDeployments => "no deployments",
        };
        log::warn!("Skipped registry {}: {}", skipped.host, reason);
    }
    match &report.identity {
        IdentityOutcome::NotRequested => {}
        IdentityOutcome::NotFound => log::warn!(
            "Service account in {} not found, pull secrets were not attached",
            report.namespace
        ),
        IdentityOutcome::Unchanged => log::info!(
            "Service account in {} already references all pull secrets",
            report.namespace
        ),
        IdentityOutcome::Updated { added, attempts } => log::info!(
            "Attached {} pull secret(s) to service account in {} ({} attempt(s))",
            added.len(),
            report.namespace,
            attempts
        ),
    }
}

async fn run<C: Cluster>(
    cluster: &C,
    config: &ReconcileConfig,
    namespace: &str,
    project: &ProjectConfig,
) -> Result<ReconcileReport> {
    let provider = DockerConfigProvider::from_env();
    let report = Reconciler::new(cluster, &provider, config, namespace)
        .reconcile_pull_secrets(&project.image_list(), &project.deployments)
        .await
        .context("failed to create pull secrets")?;
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts: Opts = Opts::parse();
    let project = ProjectConfig::load(&opts.config)?;

    let config = ReconcileConfig {
        default_email: opts.email,
        default_identity_name: opts.service_account,
        default_namespace: opts.namespace,
        interactive: !opts.non_interactive,
        max_conflict_retries: opts.max_conflict_retries,
        conflict_backoff: Duration::from_millis(opts.conflict_backoff_ms),
        ..Default::default()
    };

    let client = client(opts.context).await?;
    let namespace = config
        .default_namespace
        .clone()
        .unwrap_or_else(|| client.default_namespace().to_owned());
    log::trace!("Active namespace is {}", namespace);

    let cluster = KubeCluster::new(client);
    let report = if opts.dry_run {
        run(&DryRun::new(cluster), &config, &namespace, &project).await?
    } else {
        run(&cluster, &config, &namespace, &project).await?
    };
    print_report(&report);
    Ok(())
}
