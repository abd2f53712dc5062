use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};
use x11rb::protocol::Event;

use super::super::dispatcher::EventContext;
use super::input::spawn_command;

/// Handle Expose and ButtonPress events on notification windows
pub fn handle_window_event(ctx: &mut EventContext, event: &Event) -> Result<()> {
    let target = match event {
        Event::Expose(e) => e.window,
        Event::ButtonPress(e) => e.event,
        _ => return Ok(()),
    };

    let Some((key, window)) = ctx
        .notifications
        .widgets()
        .find(|(_, widget)| widget.window() == target)
    else {
        debug!(window = target, "Event for unknown window");
        return Ok(());
    };

    let Some(notification_event) = window.handle_x11_event(event)? else {
        return Ok(());
    };
    if let Some(button) = ctx
        .notifications
        .handle_event(key, notification_event, Instant::now())
    {
        info!(button = %button.name, data = %button.data, "Notification button clicked");
        if let Some((program, args)) = button_command(&button.data) {
            spawn_command(&program, &args)?;
        }
    }
    Ok(())
}

/// Split button data into a program and its arguments; blank data runs nothing
fn button_command(data: &str) -> Option<(String, Vec<String>)> {
    let mut words = data.split_whitespace().map(str::to_string);
    let program = words.next()?;
    Some((program, words.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_data_is_split_into_a_command() {
        assert_eq!(
            button_command("  notify-send  copied \tdone "),
            Some((
                "notify-send".to_string(),
                vec!["copied".to_string(), "done".to_string()]
            ))
        );
        assert_eq!(button_command("xterm"), Some(("xterm".to_string(), vec![])));
        assert_eq!(button_command(""), None);
        assert_eq!(button_command(" \t "), None);
    }
}
