//! Scripted demo session against the todos resource.
//!
//! Runs against the configured server, or against an in-memory resource
//! when `TODOS_OFFLINE=true`.

use std::sync::Arc;
use std::time::Duration;
use todos::{
    Config, Filter, HttpTodosApi, MockTodosApi, Todo, TodoApp, TodoEnvironment, TodoView, TodosApi, USER_ID,
};
use todosync_core::environment::SystemClock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn print_view(view: &TodoView) {
    println!("\n[{}]", view.filter);
    for row in &view.rows {
        let status = if row.todo.completed { "✓" } else { " " };
        let loading = if row.is_loading { " …" } else { "" };
        println!("  [{status}] {}{loading}", row.todo.title);
    }
    if let Some(placeholder) = &view.placeholder {
        println!("  [ ] {} …", placeholder.todo.title);
    }
    println!("  {}", view.items_left_label);
    if let (Some(message), Some(raised_at)) = (view.error_message, view.error_raised_at) {
        println!("  ! {message} (at {})", raised_at.format("%H:%M:%S"));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Todos ===");

    let api: Arc<dyn TodosApi> = if config.offline {
        Arc::new(MockTodosApi::with_todos(vec![
            Todo::new(1, USER_ID, "Buy milk", false),
            Todo::new(2, USER_ID, "Write documentation", true),
        ]))
    } else {
        Arc::new(HttpTodosApi::from_config(&config.api)?)
    };
    let env = TodoEnvironment::from_config(api, Arc::new(SystemClock), &config.app);
    let app = TodoApp::with_config(env, &config.app);

    let loaded = app.load().await?;
    println!("Loaded {loaded} todos");
    print_view(&app.view().await);

    println!("\nAdding 'Deploy to production'...");
    let added = app.add("  Deploy to production ").await?;

    println!("Adding a blank todo...");
    if let Err(error) = app.add("   ").await {
        println!("Rejected: {error}");
    }

    println!("Completing everything...");
    app.toggle_all().await?;
    print_view(&app.view().await);

    println!("\nRenaming '{}'...", added.title);
    app.rename(added.id, "Deploy to staging").await?;

    println!("Clearing completed...");
    let outcomes = app.clear_completed().await?;
    println!("{} deletes sent", outcomes.len());

    app.set_filter(Filter::Active).await?;
    print_view(&app.view().await);

    app.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
