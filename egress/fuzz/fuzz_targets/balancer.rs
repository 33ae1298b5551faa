#![no_main]

use arbitrary::Arbitrary;
use commonware_egress::{mocks, Balancer, Error, Part, Pipe};
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;

const MAX_PIPES: u8 = 8;

#[derive(Arbitrary, Debug)]
enum FuzzInput {
    Attach(u8),
    Terminate(u8),
    SetWritable(u8, bool),
    Activate(u8),
    HasOut,
    Send(Vec<u8>, bool),
}

fn fuzz(input: Vec<FuzzInput>) {
    let mut balancer = Balancer::new();
    let mut controls = HashMap::new();
    let mut carrier: Option<u64> = None;
    let mut started = false;

    for op in input {
        match op {
            FuzzInput::Attach(id) => {
                let id = (id % MAX_PIPES) as u64;
                if balancer.contains(&id) {
                    continue;
                }
                let (pipe, control) = mocks::pipe(id);
                balancer.attach(pipe);
                controls.insert(id, control);
                assert!(balancer.is_active(&id));
            }

            FuzzInput::Terminate(id) => {
                let id = (id % MAX_PIPES) as u64;
                if !balancer.contains(&id) {
                    continue;
                }
                let pipe = balancer.terminated(&id);
                assert_eq!(pipe.id(), id);
                assert!(!balancer.contains(&id));
                controls.remove(&id);
                if carrier == Some(id) {
                    carrier = None;
                    assert!(balancer.is_dropping());
                }
            }

            FuzzInput::SetWritable(id, writable) => {
                if let Some(control) = controls.get(&((id % MAX_PIPES) as u64)) {
                    control.set_writable(writable);
                }
            }

            FuzzInput::Activate(id) => {
                let id = (id % MAX_PIPES) as u64;
                if !balancer.contains(&id) || balancer.is_active(&id) {
                    continue;
                }
                balancer.activated(&id);
                assert!(balancer.is_active(&id));
            }

            FuzzInput::HasOut => {
                let ready = balancer.has_out();
                if balancer.in_message() {
                    assert!(ready);
                }
            }

            FuzzInput::Send(payload, more) => {
                let in_message = balancer.in_message() || balancer.is_dropping();
                let mut frame = Part::new(payload, more);
                let original = frame.clone();
                match balancer.send(&mut frame) {
                    Ok(Some(id)) => {
                        // A started message stays on its pipe
                        if started {
                            assert_eq!(carrier, Some(id));
                        }
                        assert_eq!(frame, Part::default());
                        carrier = more.then_some(id);
                        started = more;
                    }
                    Ok(None) => {
                        assert!(started);
                        assert_eq!(frame, Part::default());
                        started = more;
                    }
                    Err(Error::WouldBlock) => {
                        assert!(!in_message);
                        assert_eq!(frame, original);
                    }
                    Err(err) => panic!("unexpected error: {err}"),
                }
                assert_eq!(balancer.in_message() || balancer.is_dropping(), started);
            }
        }

        assert!(balancer.active() <= balancer.len());
        assert_eq!(balancer.len(), controls.len());
        let active = controls.keys().filter(|id| balancer.is_active(id)).count();
        assert_eq!(active, balancer.active());
    }
}

fuzz_target!(|input: Vec<FuzzInput>| {
    fuzz(input);
});
