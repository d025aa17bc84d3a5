//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! engine behaves identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld    RealWorld      Compare
//!      (reference)   (service +     Results
//!                     mirror writer)
//! ```

use std::{collections::BTreeMap, sync::Arc};

use brailler_core::{CellInput, Transcriber};
use brailler_harness::{
    CellChoice, ManualEnv, ModeChoice, ModelUserId, ModelWorld, ObservableState, Operation,
    OperationResult, model::operation::user_key,
};
use brailler_server::{
    ActionExecutor, MemoryGateway, MirrorConfig, MirrorHandle, TranscriptionService,
    spawn_mirror_writer,
};
use proptest::prelude::*;
use tokio::runtime::Runtime;

/// Real system wrapper that mirrors ModelWorld's interface.
struct RealWorld {
    rt: Runtime,
    service: TranscriptionService<ManualEnv>,
    writer: MirrorHandle,
    gateway: Arc<MemoryGateway>,
    /// Mirror contents captured at the last sync.
    mirror: BTreeMap<String, String>,
}

impl RealWorld {
    fn new(seed: u64) -> Self {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let env = ManualEnv::with_seed(seed);
        let gateway = Arc::new(MemoryGateway::new());
        let config = MirrorConfig::default();

        let (writer, _task) = rt.block_on(async {
            spawn_mirror_writer(gateway.clone(), env.clone(), config)
        });

        let executor =
            ActionExecutor::new(gateway.clone(), env.clone(), config, Some(writer.clone()));
        let service = TranscriptionService::new(Transcriber::new(env), executor, false);

        Self { rt, service, writer, gateway, mirror: BTreeMap::new() }
    }

    fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Submit { user, cell, mode } => {
                let input = CellInput {
                    user_id: user_key(*user),
                    bits: cell.to_bits(),
                    mode: mode.to_name(),
                };
                let submission = self.rt.block_on(self.service.submit(input)).unwrap();
                OperationResult::Submitted {
                    translated: submission.translated.to_string(),
                    full_text: submission.full_text,
                }
            },
            Operation::ReadBuffer { user } => {
                let key = user_key(Some(*user)).unwrap_or_default();
                OperationResult::Text(self.service.snapshot(&key))
            },
            Operation::SyncMirror => {
                self.rt.block_on(self.writer.flush());
                self.mirror = self
                    .service
                    .transcriber()
                    .store()
                    .users()
                    .into_iter()
                    .filter_map(|user| {
                        self.gateway.record(user.as_str()).map(|text| (user.to_string(), text))
                    })
                    .collect();
                OperationResult::Ok
            },
        }
    }

    fn observable_state(&self) -> ObservableState {
        let buffers = self
            .service
            .transcriber()
            .store()
            .users()
            .into_iter()
            .map(|user| (user.to_string(), self.service.snapshot(user.as_str())))
            .collect();
        ObservableState { buffers, mirror: self.mirror.clone() }
    }
}

fn cell_strategy() -> impl Strategy<Value = CellChoice> {
    prop_oneof![
        1 => Just(CellChoice::Missing),
        8 => (0u8..64).prop_map(CellChoice::Dots),
        2 => any::<u8>().prop_map(CellChoice::Malformed),
    ]
}

fn mode_strategy() -> impl Strategy<Value = ModeChoice> {
    prop_oneof![
        Just(ModeChoice::Missing),
        any::<u8>().prop_map(ModeChoice::Ueb),
        any::<u8>().prop_map(ModeChoice::Nemeth),
        Just(ModeChoice::Unknown),
    ]
}

fn user_strategy() -> impl Strategy<Value = ModelUserId> {
    0u8..4
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        8 => (proptest::option::of(user_strategy()), cell_strategy(), mode_strategy())
            .prop_map(|(user, cell, mode)| Operation::Submit { user, cell, mode }),
        2 => user_strategy().prop_map(|user| Operation::ReadBuffer { user }),
        1 => Just(Operation::SyncMirror),
    ]
}

fn run_and_compare(ops: &[Operation], seed: u64) -> Result<(), TestCaseError> {
    let mut model = ModelWorld::new();
    let mut real = RealWorld::new(seed);

    for (i, op) in ops.iter().enumerate() {
        let expected = model.apply(op);
        let actual = real.apply(op);
        prop_assert_eq!(&actual, &expected, "result mismatch at op {}: {:?}", i, op);
    }

    // Final sync so the mirror must match every buffer.
    model.apply(&Operation::SyncMirror);
    real.apply(&Operation::SyncMirror);

    let expected = model.observable_state();
    let actual = real.observable_state();
    prop_assert_eq!(&actual, &expected);
    prop_assert_eq!(&actual.mirror, &actual.buffers);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn real_matches_model(
        ops in proptest::collection::vec(operation_strategy(), 0..48),
        seed in any::<u64>(),
    ) {
        run_and_compare(&ops, seed)?;
    }
}

#[test]
fn scripted_sequence_matches_model() {
    let submit = |user, cell, mode| Operation::Submit { user, cell, mode };
    let ops = vec![
        submit(Some(0), CellChoice::Dots(0b10_0000), ModeChoice::Ueb(0)),
        submit(Some(0), CellChoice::Dots(0b11_0000), ModeChoice::Ueb(1)),
        submit(Some(1), CellChoice::Dots(0b10_0000), ModeChoice::Nemeth(0)),
        submit(Some(2), CellChoice::Malformed(3), ModeChoice::Ueb(0)),
        Operation::SyncMirror,
        submit(None, CellChoice::Missing, ModeChoice::Missing),
        Operation::ReadBuffer { user: 0 },
    ];

    let mut model = ModelWorld::new();
    let mut real = RealWorld::new(7);
    let results: Vec<_> = ops.iter().map(|op| (model.apply(op), real.apply(op))).collect();

    for (expected, actual) in &results {
        assert_eq!(actual, expected);
    }
    assert_eq!(results[6].1, OperationResult::Text("ab".to_string()));

    let state = real.observable_state();
    assert_eq!(state.buffers.get("u1").map(String::as_str), Some("1"));
    assert_eq!(state.buffers.get("u2").map(String::as_str), Some("?"));
    assert_eq!(state.mirror.get("u0").map(String::as_str), Some("ab"));
    // Not yet synced.
    assert!(!state.mirror.contains_key("default"));
}
