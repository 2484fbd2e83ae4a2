#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use emuipc_frame::{
    decode_batch, decode_command, encode_reply_payload, Command, EmuStatus, Opcode, Reply,
    WireValue, STATUS_LEN,
};
use emuipc_transport::{IpcStream, Transport, TransportError};
#[cfg(unix)]
use emuipc_transport::UnixDomainSocket;

pub const TITLE: &str = "Ratchet & Clank";
pub const GAME_ID: &str = "SCES_516.07";
pub const GAME_UUID: &str = "0x2e54b42a";
pub const GAME_VERSION: &str = "1.00";
pub const VERSION: &str = "PCSX2 Nightly - v1.7.0";

/// In-process emulator: byte-addressed memory plus canned metadata.
#[derive(Default)]
pub struct StubEmulator {
    memory: Mutex<HashMap<u32, u8>>,
    exchanges: AtomicUsize,
    requests: Mutex<Vec<Vec<u8>>>,
    fail: Mutex<bool>,
    saved: Mutex<Vec<(u8, HashMap<u32, u8>)>>,
}

impl StubEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every following request with the FAIL status.
    pub fn fail_everything(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn peek(&self, address: u32) -> u8 {
        self.memory
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Apply `command` and return its reply.
    pub fn apply(&self, command: &Command) -> Reply {
        let mut memory = self.memory.lock().unwrap();
        match *command {
            Command::Read { width, address } => {
                let mut raw = [0u8; 8];
                for (i, byte) in raw[..width.bytes()].iter_mut().enumerate() {
                    *byte = memory.get(&(address + i as u32)).copied().unwrap_or(0);
                }
                let value = match width.bytes() {
                    1 => WireValue::U8(raw[0]),
                    2 => WireValue::U16(u16::from_ne_bytes([raw[0], raw[1]])),
                    4 => WireValue::U32(u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]])),
                    _ => WireValue::U64(u64::from_ne_bytes(raw)),
                };
                match value {
                    WireValue::U8(v) => Reply::U8(v),
                    WireValue::U16(v) => Reply::U16(v),
                    WireValue::U32(v) => Reply::U32(v),
                    WireValue::U64(v) => Reply::U64(v),
                }
            }
            Command::Write { address, value } => {
                let bytes = value.as_u64().to_ne_bytes();
                let width = value.width().bytes();
                let bytes = if cfg!(target_endian = "little") {
                    &bytes[..width]
                } else {
                    &bytes[8 - width..]
                };
                for (i, byte) in bytes.iter().enumerate() {
                    memory.insert(address + i as u32, *byte);
                }
                Reply::Empty
            }
            Command::Version => Reply::Text(VERSION.into()),
            Command::Status => Reply::Status(EmuStatus::Running),
            Command::GameTitle => Reply::Text(TITLE.into()),
            Command::GameId => Reply::Text(GAME_ID.into()),
            Command::GameUuid => Reply::Text(GAME_UUID.into()),
            Command::GameVersion => Reply::Text(GAME_VERSION.into()),
            Command::SaveState { slot } => {
                self.saved.lock().unwrap().push((slot, memory.clone()));
                Reply::Empty
            }
            Command::LoadState { slot } => {
                if let Some((_, snapshot)) =
                    self.saved.lock().unwrap().iter().rev().find(|(s, _)| *s == slot)
                {
                    *memory = snapshot.clone();
                }
                Reply::Empty
            }
        }
    }

    /// Build the full reply for a raw request, single or batched.
    pub fn answer(&self, request: &[u8]) -> Vec<u8> {
        let commands = if request.first() == Some(&(Opcode::MultiCommand as u8)) {
            decode_batch(request).expect("well-formed batch")
        } else {
            let (command, used) = decode_command(request).expect("well-formed command");
            assert_eq!(used, request.len(), "trailing request bytes");
            vec![command]
        };

        if *self.fail.lock().unwrap() {
            return vec![0xFF];
        }

        let mut reply = vec![0x00];
        for command in &commands {
            let payload = self.apply(command);
            let start = reply.len();
            reply.resize(start + command.reply_len(), 0);
            encode_reply_payload(&payload, &mut reply[start..]).expect("payload fits");
        }
        reply
    }
}

impl Transport for StubEmulator {
    fn exchange(&self, request: &[u8], reply: &mut [u8]) -> emuipc_transport::Result<()> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.to_vec());
        let answer = self.answer(request);
        if answer[0] != 0 && reply.len() > STATUS_LEN {
            // A failing peer closes right after the status byte.
            reply[0] = answer[0];
            return Err(TransportError::ConnectionClosed {
                expected: reply.len(),
                received: STATUS_LEN,
            });
        }
        if answer.len() != reply.len() {
            return Err(TransportError::ConnectionClosed {
                expected: reply.len(),
                received: answer.len(),
            });
        }
        reply.copy_from_slice(&answer);
        Ok(())
    }
}

/// Unique socket path under the system temp dir.
pub fn temp_socket_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("emuipc-{tag}-{}-{nanos}.sock", std::process::id()))
}

/// Serve `connections` exchanges from `emulator` on a fresh Unix socket.
///
/// Returns the bound listener (kept alive by the caller) and the serving
/// thread.
#[cfg(unix)]
pub fn serve_unix(
    emulator: Arc<StubEmulator>,
    tag: &str,
    connections: usize,
) -> (Arc<UnixDomainSocket>, JoinHandle<()>) {
    let listener = Arc::new(UnixDomainSocket::bind(temp_socket_path(tag)).unwrap());
    let server = Arc::clone(&listener);
    let handle = thread::spawn(move || {
        for _ in 0..connections {
            let mut stream = server.accept().unwrap();
            let request = read_request(&mut stream);
            let reply = emulator.answer(&request);
            stream.write_all(&reply).unwrap();
        }
    });
    (listener, handle)
}

/// Read one complete request, single or batched, off `stream`.
pub fn read_request(stream: &mut IpcStream) -> Vec<u8> {
    let mut request = vec![0u8; 1];
    stream.read_exact(&mut request).unwrap();
    if request[0] == Opcode::MultiCommand as u8 {
        let mut count = [0u8; 2];
        stream.read_exact(&mut count).unwrap();
        request.extend_from_slice(&count);
        for _ in 0..u16::from_ne_bytes(count) {
            read_frame(stream, &mut request);
        }
    } else {
        let opcode = Opcode::try_from(request[0]).unwrap();
        request.resize(opcode.request_len(), 0);
        stream.read_exact(&mut request[1..]).unwrap();
    }
    request
}

fn read_frame(stream: &mut IpcStream, request: &mut Vec<u8>) {
    let mut tag = [0u8; 1];
    stream.read_exact(&mut tag).unwrap();
    let opcode = Opcode::try_from(tag[0]).unwrap();
    let start = request.len();
    request.push(tag[0]);
    request.resize(start + opcode.request_len(), 0);
    stream.read_exact(&mut request[start + 1..]).unwrap();
}
