mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use common::{StubEmulator, GAME_ID, GAME_UUID, GAME_VERSION, TITLE, VERSION};
use emuipc_frame::decode_batch;
use emuipc_session::{
    Backend, BatchLimits, Command, EmuStatus, ErrorKind, Session, WireValue,
};

const BASE: u32 = 0x0034_7D34;

fn session_on(backend: Backend) -> Session<Arc<StubEmulator>> {
    Session::with_transport(backend, Arc::new(StubEmulator::new()), BatchLimits::default())
}

#[test]
fn single_commands_round_trip() {
    let session = session_on(Backend::PCSX2);
    session.write(BASE, 5u64).unwrap();
    assert_eq!(session.read::<u64>(BASE).unwrap(), 5);

    session.write(BASE + 0x10, 6u32).unwrap();
    assert_eq!(session.read::<u32>(BASE + 0x10).unwrap(), 6);
    assert_eq!(session.read::<u8>(BASE + 0x20).unwrap(), 0);

    session.write(BASE + 0x30, -1i16).unwrap();
    assert_eq!(session.read::<i16>(BASE + 0x30).unwrap(), -1);
    assert_eq!(session.read::<u16>(BASE + 0x30).unwrap(), u16::MAX);
    assert_eq!(session.transport().exchanges(), 8);
}

#[test]
fn metadata_queries() {
    let session = session_on(Backend::PCSX2);
    assert_eq!(session.version().unwrap(), VERSION);
    assert_eq!(session.status().unwrap(), EmuStatus::Running);
    assert_eq!(session.game_title().unwrap(), TITLE);
    assert_eq!(session.game_id().unwrap(), GAME_ID);
    assert_eq!(session.game_uuid().unwrap(), GAME_UUID);
    assert_eq!(session.game_version().unwrap(), GAME_VERSION);
}

#[test]
fn save_and_load_state() {
    let session = session_on(Backend::DUCKSTATION);
    session.write(BASE, 1u8).unwrap();
    session.save_state(2).unwrap();
    session.write(BASE, 9u8).unwrap();
    session.load_state(2).unwrap();
    assert_eq!(session.read::<u8>(BASE).unwrap(), 1);
}

#[test]
fn rpcs3_rejects_save_states_without_io() {
    let session = session_on(Backend::RPCS3);
    assert_eq!(session.save_state(0).unwrap_err().kind(), ErrorKind::Unimplemented);
    assert_eq!(session.load_state(0).unwrap_err().kind(), ErrorKind::Unimplemented);
    assert_eq!(session.transport().exchanges(), 0);

    session.write(BASE, 3u32).unwrap();
    assert_eq!(session.game_title().unwrap(), TITLE);
}

#[test]
fn wide_values_are_unimplemented_without_io() {
    let session = session_on(Backend::PCSX2);
    assert_eq!(session.read::<u128>(BASE).unwrap_err().kind(), ErrorKind::Unimplemented);
    assert_eq!(
        session.write(BASE, 1i128).unwrap_err().kind(),
        ErrorKind::Unimplemented
    );
    assert_eq!(session.transport().exchanges(), 0);
}

#[test]
fn fail_status_fails_every_single_command() {
    let emulator = Arc::new(StubEmulator::new());
    let session =
        Session::with_transport(Backend::PCSX2, Arc::clone(&emulator), BatchLimits::default());
    emulator.fail_everything();

    for err in [
        session.read::<u32>(BASE).unwrap_err(),
        session.write(BASE, 1u8).unwrap_err(),
        session.version().unwrap_err(),
        session.status().unwrap_err(),
        session.save_state(1).unwrap_err(),
    ] {
        assert!(err.is_peer_failure(), "{err}");
        assert_eq!(err.kind(), ErrorKind::Fail);
    }
}

#[test]
fn concurrent_batches_are_serialized() {
    let session = Arc::new(session_on(Backend::PCSX2));
    let first_finalizing = Arc::new(AtomicBool::new(false));
    let (opened_tx, opened_rx) = mpsc::channel();

    let first = {
        let session = Arc::clone(&session);
        let first_finalizing = Arc::clone(&first_finalizing);
        thread::spawn(move || {
            let mut batch = session.initialize_batch();
            opened_tx.send(()).unwrap();
            for i in 0..4u32 {
                batch.write(BASE + i, 0xA0u8 + i as u8).unwrap();
            }
            // Give the second thread time to block on the batch lock.
            thread::sleep(Duration::from_millis(100));
            first_finalizing.store(true, Ordering::SeqCst);
            let mut batch = batch.finalize().unwrap();
            session.send_batch(&mut batch).unwrap();
        })
    };

    opened_rx.recv().unwrap();
    let second = {
        let session = Arc::clone(&session);
        let first_finalizing = Arc::clone(&first_finalizing);
        thread::spawn(move || {
            let mut batch = session.initialize_batch();
            assert!(
                first_finalizing.load(Ordering::SeqCst),
                "second batch opened while the first was still building"
            );
            batch.read::<u32>(BASE).unwrap();
            let mut batch = batch.finalize().unwrap();
            session.send_batch(&mut batch).unwrap();
        })
    };

    first.join().unwrap();
    second.join().unwrap();

    // Sends happen outside the locks, so either batch may arrive first, but
    // each message holds exactly one thread's operations.
    let mut batches: Vec<_> = session
        .transport()
        .requests()
        .iter()
        .map(|request| decode_batch(request).unwrap())
        .collect();
    batches.sort_by_key(Vec::len);
    assert_eq!(batches.len(), 2);
    assert_eq!(
        batches[1],
        (0..4u32)
            .map(|i| Command::Write {
                address: BASE + i,
                value: WireValue::U8(0xA0 + i as u8),
            })
            .collect::<Vec<_>>()
    );
    assert_eq!(
        batches[0],
        vec![Command::Read {
            width: emuipc_session::Width::W32,
            address: BASE
        }]
    );
}

#[test]
fn single_command_waits_for_open_batch() {
    let session = Arc::new(session_on(Backend::PCSX2));
    let batch_closed = Arc::new(AtomicBool::new(false));

    let mut batch = session.initialize_batch();
    batch.write(BASE, 7u8).unwrap();

    let reader = {
        let session = Arc::clone(&session);
        let batch_closed = Arc::clone(&batch_closed);
        thread::spawn(move || {
            let value = session.read::<u8>(BASE).unwrap();
            (batch_closed.load(Ordering::SeqCst), value)
        })
    };

    thread::sleep(Duration::from_millis(100));
    batch_closed.store(true, Ordering::SeqCst);
    let mut batch = batch.finalize().unwrap();
    // The locks are released by finalize; the reader may run before or
    // after this send.
    session.send_batch(&mut batch).unwrap();

    let (waited, _) = reader.join().unwrap();
    assert!(waited, "single command ran while a batch was open");
    assert_eq!(session.read::<u8>(BASE).unwrap(), 7);
}

#[test]
fn shared_session_from_many_threads() {
    let session = Arc::new(session_on(Backend::PCSX2));
    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let address = BASE + i * 8;
                session.write(address, u64::from(i) << 32).unwrap();
                session.read::<u64>(address).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), (i as u64) << 32);
    }
}

#[test]
fn poisoned_locks_are_recovered() {
    let session = Arc::new(session_on(Backend::PCSX2));
    let panicker = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            let _batch = session.initialize_batch();
            panic!("boom");
        })
    };
    assert!(panicker.join().is_err());

    session.write(BASE, 4u16).unwrap();
    let mut batch = session.initialize_batch();
    batch.read::<u16>(BASE).unwrap();
    let mut batch = batch.finalize().unwrap();
    session.send_batch(&mut batch).unwrap();
    assert_eq!(batch.value::<u16>(0).unwrap(), 4);
}
