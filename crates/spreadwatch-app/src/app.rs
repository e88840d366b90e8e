//! Application wiring and main loop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use spreadwatch_core::{ErrorSink, ListRecord, MemorySink};
use spreadwatch_feed::{FeedView, Fetcher};
use spreadwatch_telemetry::{Metrics, TracingErrorSink};
use spreadwatch_view::{
    ModalBroker, ModalView, StaticTranslator, Translator, FALLBACK_MARKER_KEY,
};

use crate::client::{ApiClient, RowMutations};
use crate::config::AppConfig;
use crate::console::{modal_prompt, Console, ConsoleNotifier, Reply, HELP};
use crate::error::{AppError, AppResult};
use crate::frame::TableFrame;
use crate::views::dashboard::DASHBOARD_VIEW;
use crate::views::{AdminTableView, DashboardView, ViewContext};

/// Absorbed errors kept for the `errors` command.
const ERROR_HISTORY: usize = 200;

/// Built-in labels; `[labels]` in the config overrides them.
fn default_labels() -> HashMap<String, String> {
    [
        (FALLBACK_MARKER_KEY, "could not display this row"),
        ("value.yes", "yes"),
        ("value.no", "no"),
        ("dashboard.spread", "spread"),
        ("dashboard.unsupported", "n/a"),
        ("dashboard.no_data", "no data"),
        ("view.dashboard", "Prices"),
        ("confirm.delete", "Delete"),
        ("confirm.toggle", "Set"),
        ("action.busy", "Another action is still running on this row"),
        ("action.delete.done", "Deleted"),
        ("action.delete.failed", "Delete failed"),
        ("action.toggle.done", "Updated"),
        ("action.toggle.failed", "Update failed"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Translator with built-in labels overlaid by `labels`.
pub fn build_translator(labels: &HashMap<String, String>) -> StaticTranslator {
    let mut merged = default_labels();
    merged.extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    StaticTranslator::new(merged)
}

/// All running views.
pub struct ViewSet {
    dashboard: Option<DashboardView>,
    tables: Vec<Arc<AdminTableView>>,
}

impl ViewSet {
    /// Start every configured view. Must be called within a Tokio runtime.
    ///
    /// `fetcher_for` maps an endpoint to the fetcher polling it.
    pub fn start<F>(
        config: &AppConfig,
        fetcher_for: F,
        mutations: Arc<dyn RowMutations>,
        ctx: &ViewContext,
    ) -> AppResult<Self>
    where
        F: Fn(&str) -> Arc<dyn Fetcher<ListRecord>>,
    {
        let dashboard = if config.dashboard.enabled {
            Some(DashboardView::start(
                &config.dashboard,
                fetcher_for(&config.dashboard.endpoint),
                ctx,
            )?)
        } else {
            None
        };

        let tables = config
            .tables
            .iter()
            .map(|table| {
                AdminTableView::start(
                    table.clone(),
                    fetcher_for(&table.endpoint),
                    Arc::clone(&mutations),
                    ctx,
                )
                .map(Arc::new)
            })
            .collect::<AppResult<Vec<_>>>()?;

        info!(
            dashboard = dashboard.is_some(),
            tables = tables.len(),
            "Views started"
        );
        Ok(Self { dashboard, tables })
    }

    pub fn names(&self) -> Vec<String> {
        self.dashboard
            .iter()
            .map(|d| d.name().to_string())
            .chain(self.tables.iter().map(|t| t.name().to_string()))
            .collect()
    }

    /// View shown at startup.
    pub fn default_view(&self) -> Option<String> {
        self.names().into_iter().next()
    }

    pub fn table(&self, name: &str) -> AppResult<Arc<AdminTableView>> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| AppError::UnknownView(name.to_string()))
    }

    pub fn render(&self, name: &str) -> AppResult<TableFrame> {
        match &self.dashboard {
            Some(dashboard) if name == DASHBOARD_VIEW => Ok(dashboard.render()),
            _ => Ok(self.table(name)?.render()),
        }
    }

    pub fn subscribe(&self, name: &str) -> AppResult<watch::Receiver<FeedView<ListRecord>>> {
        match &self.dashboard {
            Some(dashboard) if name == DASHBOARD_VIEW => Ok(dashboard.subscribe()),
            _ => Ok(self.table(name)?.subscribe()),
        }
    }

    pub fn refresh(&self, name: &str) -> AppResult<()> {
        match &self.dashboard {
            Some(dashboard) if name == DASHBOARD_VIEW => dashboard.refresh(),
            _ => self.table(name)?.refresh(),
        }
        Ok(())
    }

    /// Stop every poller. No in-flight response changes a view afterwards.
    pub fn stop_all(&self) {
        if let Some(dashboard) = &self.dashboard {
            dashboard.stop();
        }
        for table in &self.tables {
            table.stop();
        }
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    client: Arc<ApiClient>,
    broker: Arc<ModalBroker>,
    errors: Arc<MemorySink>,
    ctx: ViewContext,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let client = Arc::new(ApiClient::new(&config.api)?);
        let broker = Arc::new(ModalBroker::new());
        let errors = Arc::new(MemorySink::new(ERROR_HISTORY));
        let translator: Arc<dyn Translator> = Arc::new(build_translator(&config.labels));
        let sink: Arc<dyn ErrorSink> = Arc::new((TracingErrorSink, Arc::clone(&errors)));

        let ctx = ViewContext {
            translator,
            sink,
            broker: Arc::clone(&broker),
            notifier: Arc::new(ConsoleNotifier),
        };

        Ok(Self {
            config,
            client,
            broker,
            errors,
            ctx,
        })
    }

    /// Run until `quit`, end of input or Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let client = Arc::clone(&self.client);
        let views = Arc::new(ViewSet::start(
            &self.config,
            |endpoint| client.list_fetcher(endpoint),
            Arc::clone(&self.client) as Arc<dyn RowMutations>,
            &self.ctx,
        )?);

        let first = views.default_view().unwrap_or_default();
        let (active_tx, active_rx) = watch::channel(first);
        let token = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for name in views.names() {
            let feed = views.subscribe(&name)?;
            tasks.spawn(render_loop(
                Arc::clone(&views),
                name,
                feed,
                active_rx.clone(),
                token.clone(),
            ));
        }
        tasks.spawn(prompt_loop(self.broker.subscribe(), token.clone()));

        let console = Console::new(
            Arc::clone(&views),
            Arc::clone(&self.broker),
            Arc::clone(&self.errors),
            Arc::clone(&self.ctx.notifier),
            active_tx,
        );
        println!("{HELP}");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    info!("Ctrl-C received, shutting down");
                    break;
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => match console.handle(&line) {
                            Reply::Text(text) => println!("{text}"),
                            Reply::Silent => {}
                            Reply::Quit => break,
                        },
                        None => {
                            info!("Input closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        token.cancel();
        views.stop_all();
        let dismissed = self.broker.dismiss_all();
        if dismissed > 0 {
            info!(dismissed, "Dismissed open dialogs");
        }
        tasks.shutdown().await;

        match Metrics::encode_text() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
        info!("Shutdown complete");
        Ok(())
    }
}

/// Reprint view `name` whenever its feed changes while it is displayed.
async fn render_loop(
    views: Arc<ViewSet>,
    name: String,
    mut feed: watch::Receiver<FeedView<ListRecord>>,
    mut active: watch::Receiver<String>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            changed = feed.changed() => if changed.is_err() { break },
            changed = active.changed() => if changed.is_err() { break },
        }
        if *active.borrow_and_update() != name {
            continue;
        }
        match views.render(&name) {
            Ok(frame) => println!("{frame}"),
            Err(e) => warn!(view = %name, error = %e, "Render failed"),
        }
    }
}

/// Print each dialog as it becomes visible.
async fn prompt_loop(mut modal: watch::Receiver<Option<ModalView>>, token: CancellationToken) {
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            changed = modal.changed() => if changed.is_err() { break },
        }
        if let Some(view) = modal.borrow_and_update().as_ref() {
            println!("{}", modal_prompt(view));
        }
    }
}
