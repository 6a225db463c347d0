//! Property tests: random operation sequences never move a record backwards.

mod common;

use approval_engine::*;
use approval_types::*;
use common::*;
use proptest::prelude::*;

const ROLES: [&str; 4] = ["manager", "finance", "cfo", "treasury"];

#[derive(Clone, Debug)]
enum Op {
    Act { role: usize, reject: bool },
    Cancel,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => (0..ROLES.len(), prop::bool::weighted(0.15))
            .prop_map(|(role, reject)| Op::Act { role, reject }),
        1 => Just(Op::Cancel),
    ]
}

fn run_ops(amount: i64, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let (engine, ledger) = make_engine(&[]);
        let record = engine.submit(&requester(), invoice(amount)).await.unwrap();
        let gate_count = record.resolved_gates.len();
        let mut last_index = record.current_gate_index;

        for op in ops {
            let result = match op {
                Op::Act { role, reject } => {
                    let (decision, comment) = if reject {
                        (Decision::Reject, Some("out of policy".to_string()))
                    } else {
                        (Decision::Approve, None)
                    };
                    engine
                        .act(
                            &record.id,
                            &Actor::new("someone", ROLES[role]),
                            decision,
                            comment,
                            None,
                        )
                        .await
                }
                Op::Cancel => engine.cancel(&record.id, &requester(), None).await,
            };

            let stored = engine.get(&record.id).await.unwrap();
            if let Ok(returned) = &result {
                prop_assert_eq!(returned, &stored);
            }
            prop_assert!(stored.current_gate_index >= last_index);
            prop_assert_eq!(
                stored.current_gate_index == Some(gate_count),
                stored.state == RecordState::Approved
            );
            prop_assert!(stored.history().len() <= gate_count);
            last_index = stored.current_gate_index;
        }

        let stored = engine.get(&record.id).await.unwrap();
        prop_assert!(engine.verify(&record.id).await.is_ok());
        prop_assert_eq!(
            ledger.journal().get(&record.id).is_some(),
            stored.state == RecordState::Approved
        );
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_gate_index_never_decreases(
        amount in 1i64..400_000,
        ops in prop::collection::vec(op_strategy(), 0..12),
    ) {
        run_ops(amount, ops)?;
    }
}
