//! Month View Example
//!
//! Drives a headless calendar through navigation, a view change, inline
//! events and a time zone switch, printing each snapshot.
//!
//! Pass a RON option file as the first argument to start from it. Set
//! `RUST_LOG=kalends_manager=debug` to watch the manager work.

use kalends_core::{value_map, OptionSet, Value};
use kalends_manager::{
    day_grid_plugin, load_options, CalendarData, CalendarDataManager, CalendarDataManagerProps, HeadlessCalendar,
};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

fn print_snapshot(data: &CalendarData) {
    let store = &data.state.renderable_event_store;
    println!("  [{}] {} ({} events)", data.view_type(), data.view_title, store.instances.len());
    for instance in store.instances.values() {
        if let Some(def) = store.defs.get(&instance.def_id) {
            println!("    - {} at {}", def.title, instance.range.start);
        }
    }
}

fn main() -> kalends_manager::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Kalends Month View Example ===\n");

    let options = match std::env::args().nth(1) {
        Some(path) => load_options(path)?,
        None => OptionSet::new(value_map! {
            "timeZone" => "UTC",
            "initialDate" => "2024-05-15",
            "events" => vec![
                Value::from(value_map! { "id" => "standup", "title" => "Standup", "start" => "2024-05-15T09:30:00" }),
                Value::from(value_map! { "id" => "review", "title" => "Review", "start" => "2024-06-03T14:00:00" }),
                Value::from(value_map! { "id" => "offsite", "title" => "Offsite", "start" => "2024-05-20", "end" => "2024-05-22" }),
            ],
        }),
    };

    let calendar = HeadlessCalendar::new();
    let props = CalendarDataManagerProps::new(options, calendar.clone())
        .plugin(day_grid_plugin())
        .handler("loading", |_, is_loading| println!("  (loading: {is_loading})"))
        .on_data(print_snapshot);
    let manager = CalendarDataManager::new(props)?;

    println!("\nNext month:");
    calendar.next()?;

    println!("\nBack two months, batched:");
    manager.batch_rendering(|| -> kalends_manager::Result<()> {
        calendar.prev()?;
        calendar.prev()
    })??;

    println!("\nWeek view around May 20:");
    calendar.change_view("dayGridWeek", Some(&Value::from("2024-05-20")))?;

    println!("\nSwitching to +02:00:");
    manager.reset_options(OptionSet::new(value_map! { "timeZone" => "+02:00" }), true)?;

    let data: Rc<CalendarData> = manager.current_data()?;
    println!("\nFinal: {} in {}", data.view_title, data.calendar_options().get_str("timeZone").unwrap_or("local"));
    Ok(())
}
