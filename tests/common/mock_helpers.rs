//! Mock construction helpers

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::thread::JoinHandle;

use scope_engine::acquisition::{AcquisitionEngine, AcquisitionSettings};
use scope_engine::capture::{MockCaptureDevice, MockPattern, MockSignal, SampleReader};
use scope_engine::control::{ControlResponse, REQUEST};
use scope_engine::types::RawSample;

/// Device whose channel 1 is `start + n`, channel 2 silent
pub fn ramp_device(start: f64) -> MockCaptureDevice {
    let signal = MockSignal::new(
        MockPattern::Ramp { start, step: 1.0 },
        MockPattern::Constant(0.0),
    );
    MockCaptureDevice::new(signal, 44_100, 441)
}

/// Device whose channel 1 is a falling ramp `start - n`
pub fn falling_ramp_device(start: f64) -> MockCaptureDevice {
    let signal = MockSignal::new(
        MockPattern::Ramp { start, step: -1.0 },
        MockPattern::Constant(0.0),
    );
    MockCaptureDevice::new(signal, 44_100, 441)
}

/// Device producing a sine of `amplitude` on both channels
pub fn sine_device(frequency: f64, amplitude: f64) -> MockCaptureDevice {
    let pattern = MockPattern::Sine {
        frequency,
        amplitude,
        offset: 0.0,
    };
    MockCaptureDevice::new(MockSignal::new(pattern, pattern), 44_100, 441)
}

/// Device replaying `samples` forever
pub fn looping_device(samples: Vec<RawSample>) -> MockCaptureDevice {
    MockCaptureDevice::scripted(samples, 441).looping()
}

/// Engine in analog mode with default settings
pub fn engine(device: MockCaptureDevice) -> AcquisitionEngine<MockCaptureDevice> {
    AcquisitionEngine::new(SampleReader::new(device), AcquisitionSettings::default())
}

/// Encode a list of responses as wire frames
pub fn frames(responses: &[ControlResponse]) -> Vec<Vec<u8>> {
    responses
        .iter()
        .map(|r| r.encode().expect("response should encode"))
        .collect()
}

/// Control peer answering each request with the next frame, then hanging up
///
/// The join handle yields the number of requests answered.
pub fn scripted_peer(frames: Vec<Vec<u8>>) -> (UnixStream, JoinHandle<usize>) {
    let (engine_side, mut peer) = UnixStream::pair().expect("socket pair");
    let handle = std::thread::spawn(move || {
        let mut answered = 0;
        for frame in frames {
            let mut request = [0u8; 1];
            if peer.read_exact(&mut request).is_err() {
                break;
            }
            assert_eq!(request[0], REQUEST);
            peer.write_all(&frame).expect("peer write");
            answered += 1;
        }
        answered
    });
    (engine_side, handle)
}

/// Control peer answering `n` (no-op) until the engine hangs up
pub fn idle_peer() -> (UnixStream, JoinHandle<usize>) {
    let (engine_side, mut peer) = UnixStream::pair().expect("socket pair");
    let handle = std::thread::spawn(move || {
        let noop = ControlResponse::NoOp.encode().expect("no-op encodes");
        let mut answered = 0;
        let mut request = [0u8; 1];
        while peer.read_exact(&mut request).is_ok() {
            if peer.write_all(&noop).is_err() {
                break;
            }
            answered += 1;
        }
        answered
    });
    (engine_side, handle)
}
