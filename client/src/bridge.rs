//! Text line protocol spoken with the local display
//!
//! Applied events go out as newline-terminated lines; key tokens come back
//! on the same TCP connection.

use log::info;
use shared::{EventData, FatalError};
use tokio::net::TcpStream;

/// Renders an applied event as a display line, using the roster of the game
/// it belongs to. `GameOver` has no line.
pub fn render_event(data: &EventData, roster: &[String]) -> Option<String> {
    match data {
        EventData::NewGame {
            width,
            height,
            players,
        } => Some(format!("NEW_GAME {} {} {}\n", width, height, players.join(" "))),
        EventData::Pixel { player, x, y } => roster
            .get(usize::from(*player))
            .map(|name| format!("PIXEL {} {} {}\n", x, y, name)),
        EventData::PlayerEliminated { player } => roster
            .get(usize::from(*player))
            .map(|name| format!("PLAYER_ELIMINATED {}\n", name)),
        EventData::GameOver => None,
    }
}

/// Opens the display connection with Nagle's algorithm disabled so each
/// line leaves immediately.
pub async fn connect(host: &str, port: u16) -> Result<TcpStream, FatalError> {
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    info!("Connected to display at {}:{}", host, port);
    Ok(stream)
}
