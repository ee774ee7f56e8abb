//! Client protocol driver: decodes the server's event stream for the
//! display and reports intent and cursor back on a fixed heartbeat.

use crate::bridge::{self, render_event};
use crate::config::ClientConfig;
use crate::input::InputManager;
use log::{debug, info};
use shared::{FatalError, StreamDecoder, HEARTBEAT_INTERVAL};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::time::interval;

pub struct Client {
    socket: Arc<UdpSocket>,
    display: TcpStream,
    decoder: Arc<Mutex<StreamDecoder>>,
    input_manager: Arc<Mutex<InputManager>>,
}

impl Client {
    /// Resolves the server, opens the UDP socket and connects to the display.
    pub async fn new(config: &ClientConfig) -> Result<Self, FatalError> {
        let server_addr = resolve(&config.game_server, config.port).await?;
        let socket = connect_udp(server_addr).await?;
        info!("Sending to game server at {}", server_addr);

        let display = bridge::connect(&config.gui_server, config.gui_port).await?;
        Ok(Self::with_parts(socket, display, &config.player_name))
    }

    /// `socket` must already be connected to the game server.
    pub fn with_parts(socket: UdpSocket, display: TcpStream, player_name: &str) -> Self {
        Self {
            socket: Arc::new(socket),
            display,
            decoder: Arc::new(Mutex::new(StreamDecoder::new())),
            input_manager: Arc::new(Mutex::new(InputManager::new(player_name))),
        }
    }

    /// Runs the receive, display and heartbeat tasks until one of them fails.
    pub async fn run(self) -> Result<(), FatalError> {
        let (display_reader, display_writer) = self.display.into_split();

        let mut receiver = tokio::spawn(receive_loop(
            Arc::clone(&self.socket),
            Arc::clone(&self.decoder),
            display_writer,
        ));
        let mut display = tokio::spawn(display_loop(
            display_reader,
            Arc::clone(&self.input_manager),
        ));
        let mut heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&self.socket),
            Arc::clone(&self.decoder),
            Arc::clone(&self.input_manager),
        ));

        let result = tokio::select! {
            result = &mut receiver => result,
            result = &mut display => result,
            result = &mut heartbeat => result,
        };

        receiver.abort();
        display.abort();
        heartbeat.abort();
        result.map_err(|e| FatalError::Task(e.to_string()))?
    }
}

pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, FatalError> {
    lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| FatalError::Resolve(format!("{}:{}", host, port)))
}

/// Binds a wildcard socket of the server's address family and connects it.
pub async fn connect_udp(server_addr: SocketAddr) -> Result<UdpSocket, FatalError> {
    let local = if server_addr.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(server_addr).await?;
    Ok(socket)
}

/// Feeds datagrams through the decoder and writes a line per applied event.
async fn receive_loop(
    socket: Arc<UdpSocket>,
    decoder: Arc<Mutex<StreamDecoder>>,
    mut display: OwnedWriteHalf,
) -> Result<(), FatalError> {
    let mut buffer = [0u8; 2048];

    loop {
        let len = match socket.recv(&mut buffer).await {
            Ok(len) => len,
            // ICMP port unreachable surfaces here while the server is down.
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                debug!("Game server unreachable: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = {
            let mut decoder = decoder.lock().await;
            let events = decoder.decode(&buffer[..len]);
            events
                .iter()
                .filter_map(|event| render_event(&event.data, decoder.roster()))
                .collect()
        };

        for line in lines {
            display.write_all(line.as_bytes()).await?;
        }
    }
}

/// Applies key tokens from the display until it hangs up.
async fn display_loop(
    display: OwnedReadHalf,
    input_manager: Arc<Mutex<InputManager>>,
) -> Result<(), FatalError> {
    let mut lines = BufReader::new(display).lines();

    while let Some(line) = lines.next_line().await? {
        input_manager.lock().await.apply_line(&line);
    }

    Err(FatalError::BridgeClosed)
}

/// Reports intent and cursor every heartbeat, changed or not.
async fn heartbeat_loop(
    socket: Arc<UdpSocket>,
    decoder: Arc<Mutex<StreamDecoder>>,
    input_manager: Arc<Mutex<InputManager>>,
) -> Result<(), FatalError> {
    let mut interval = interval(HEARTBEAT_INTERVAL);

    loop {
        interval.tick().await;

        let cursor = decoder.lock().await.expected_cursor();
        let datagram = input_manager.lock().await.heartbeat(cursor).encode()?;

        match socket.send(&datagram).await {
            Ok(sent) if sent == datagram.len() => {}
            Ok(sent) => {
                return Err(FatalError::PartialWrite {
                    sent,
                    expected: datagram.len(),
                })
            }
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                debug!("Game server unreachable: {}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::codec::{decode_input, encode_frame, pack_datagrams};
    use shared::{Event, EventData, TurnDirection};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const PATIENCE: Duration = Duration::from_secs(5);

    /// Waits for a heartbeat matching `accept`, returning its sender.
    async fn heartbeat_where(
        server: &UdpSocket,
        accept: impl Fn(TurnDirection, u32) -> bool,
    ) -> SocketAddr {
        let mut buffer = [0u8; 2048];
        timeout(PATIENCE, async {
            loop {
                let (len, addr) = server.recv_from(&mut buffer).await.unwrap();
                let input = decode_input(&buffer[..len]).unwrap().validate().unwrap();
                assert_eq!(input.player_name, "alice");
                if accept(input.turn_direction, input.next_expected_event_no) {
                    return addr;
                }
            }
        })
        .await
        .expect("no matching heartbeat")
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = resolve("127.0.0.1", 2021).await.unwrap();
        assert_eq!(addr, "127.0.0.1:2021".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let display = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let config = ClientConfig {
            game_server: "127.0.0.1".to_string(),
            port: server.local_addr().unwrap().port(),
            player_name: "alice".to_string(),
            gui_server: "127.0.0.1".to_string(),
            gui_port: display.local_addr().unwrap().port(),
        };
        let client = Client::new(&config).await.unwrap();
        let (display_stream, _) = display.accept().await.unwrap();
        let run = tokio::spawn(client.run());

        let (display_reader, mut display_writer) = display_stream.into_split();
        let mut display_lines = BufReader::new(display_reader).lines();

        // Idle heartbeats report nothing received and no intent.
        heartbeat_where(&server, |direction, cursor| {
            direction == TurnDirection::Straight && cursor == 0
        })
        .await;

        display_writer.write_all(b"LEFT_KEY_DOWN\n").await.unwrap();
        let client_addr = heartbeat_where(&server, |direction, _| direction == TurnDirection::Left).await;

        let frames: Vec<Vec<u8>> = [
            Event::new(
                0,
                EventData::NewGame {
                    width: 64,
                    height: 48,
                    players: vec!["alice".to_string(), "bob".to_string()],
                },
            ),
            Event::new(1, EventData::Pixel { player: 0, x: 3, y: 4 }),
        ]
        .iter()
        .map(|event| encode_frame(event).unwrap())
        .collect();
        for datagram in pack_datagrams(11, &frames) {
            server.send_to(&datagram, client_addr).await.unwrap();
        }

        let first = timeout(PATIENCE, display_lines.next_line()).await.unwrap().unwrap();
        let second = timeout(PATIENCE, display_lines.next_line()).await.unwrap().unwrap();
        assert_eq!(first.as_deref(), Some("NEW_GAME 64 48 alice bob"));
        assert_eq!(second.as_deref(), Some("PIXEL 3 4 alice"));

        heartbeat_where(&server, |_, cursor| cursor == 2).await;

        // Hanging up the display stops the client.
        drop(display_writer);
        drop(display_lines);
        let result = timeout(PATIENCE, run).await.unwrap().unwrap();
        assert!(matches!(result, Err(FatalError::BridgeClosed) | Err(FatalError::Io(_))));
    }
}
