//! Fuzz target for [`Transcriber`] submission
//!
//! Arbitrary user ids, cell strings and mode names must never panic and must
//! never corrupt another user's text.
//!
//! # Strategy
//!
//! - Raw inputs: Any strings for bits, user and mode, including empty and
//!   non-ASCII
//! - Paired engines: The same input goes to a permissive and a strict
//!   transcriber
//! - Time: The manual clock advances between submissions
//!
//! # Invariants
//!
//! - Permissive submission ALWAYS succeeds
//! - Full text is the previous text plus exactly the translated symbol
//! - Revision increases by exactly one per accepted cell
//! - Only the submitting user's text changes
//! - Strict rejects EXACTLY the cells permissive maps to the fallback symbol,
//!   plus unknown mode names
//! - NEVER panic on malformed input

#![no_main]

use std::{collections::HashMap, sync::Arc, time::Duration};

use arbitrary::Arbitrary;
use brailler_core::{
    CellInput, FALLBACK_SYMBOL, Mode, TranslationPolicy, Transcriber, Translator, UserId,
};
use brailler_harness::ManualEnv;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    Submit { user: Option<String>, bits: Option<String>, mode: Option<String> },
    Tick { advance_ms: u16 },
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    seed: u64,
    events: Vec<FuzzEvent>,
}

fuzz_target!(|input: FuzzInput| {
    let env = ManualEnv::with_seed(input.seed);
    let translator = Arc::new(Translator::new());
    let permissive =
        Transcriber::with_policy(env.clone(), Arc::clone(&translator), TranslationPolicy::Permissive);
    let strict = Transcriber::with_policy(env.clone(), translator, TranslationPolicy::Strict);

    let mut expected: HashMap<UserId, (String, u64)> = HashMap::new();

    for event in input.events {
        match event {
            FuzzEvent::Submit { user, bits, mode } => {
                let cell = CellInput { user_id: user, bits, mode };
                let user = UserId::resolve(cell.user_id.as_deref());

                let accepted = match permissive.submit(cell.clone()) {
                    Ok(submission) => submission,
                    Err(err) => panic!("permissive submit failed: {err}"),
                };
                assert_eq!(accepted.user_id, user);

                let (text, revision) = expected.entry(user.clone()).or_default();
                text.push_str(accepted.translated);
                *revision += 1;
                assert_eq!(&accepted.full_text, text);
                assert_eq!(accepted.revision, *revision);

                let unknown_mode =
                    cell.mode.as_deref().is_some_and(|name| name.parse::<Mode>().is_err());
                let fell_back = accepted.translated == FALLBACK_SYMBOL;
                assert_eq!(strict.submit(cell).is_err(), fell_back || unknown_mode);
            },
            FuzzEvent::Tick { advance_ms } => {
                env.advance(Duration::from_millis(u64::from(advance_ms)));
            },
        }
    }

    for (user, (text, _)) in &expected {
        assert_eq!(&permissive.snapshot(user.as_str()), text);
    }
    assert_eq!(permissive.store().len(), expected.len());
});
