use anyhow::Result;

mod api;
mod app;
mod config;
mod envelope;
mod handler;
mod poller;
mod render;
mod tui;
mod ui;
mod voice;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(config, events.sender());

    // Initial sidebar data, then periodic status refreshes
    app.refresh_stats();
    poller::spawn(
        app.client.clone(),
        app.config.poll_interval_secs.max(1),
        events.sender(),
    );

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
) -> Result<()> {
    loop {
        // Reap any finished background requests before drawing. The 300ms
        // tick guarantees this runs even with no input.
        app.poll_tasks().await;

        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
