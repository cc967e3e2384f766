//! Test utilities for the transport
//!
//! In-memory device directory and connection opener that record every call
//! and can be told to fail at each step.
//!
//! # Example
//!
//! ```
//! use transport::UsbTransport;
//! use transport::test_utils::{MockDevice, MockDirectory, MockOpener, ReadResponse};
//!
//! let device = MockDevice::printer(0x01, 0x82);
//! let opener = MockOpener::new();
//! opener.push_read(ReadResponse::Data(vec![0x12]));
//!
//! let mut transport = UsbTransport::open(&device, &MockDirectory, &opener).unwrap();
//! transport.write(&[0x10, 0x04, 0x01]).unwrap();
//! assert_eq!(transport.read().unwrap(), vec![0x12]);
//! ```

use crate::connection::{Connection, ConnectionOpener, DeviceDirectory};
use crate::descriptor::{
    Direction, EndpointDescriptor, InterfaceDescriptor, PRINTER_CLASS, TransferKind,
};
use crate::error::BackendError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Device topology served by [`MockDirectory`]
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    pub interfaces: Vec<InterfaceDescriptor>,
}

impl MockDevice {
    /// Single printer interface with one bulk endpoint in each direction
    pub fn printer(write_endpoint: u8, read_endpoint: u8) -> Self {
        Self {
            interfaces: vec![create_printer_interface(
                0,
                vec![
                    EndpointDescriptor::bulk(write_endpoint, 64),
                    EndpointDescriptor::bulk(read_endpoint, 64),
                ],
            )],
        }
    }

    /// HID keyboard, no printer interface
    pub fn keyboard() -> Self {
        Self {
            interfaces: vec![InterfaceDescriptor {
                number: 0,
                alternate_setting: 0,
                class_code: 0x03,
                sub_class_code: 0x01,
                protocol_code: 0x01,
                endpoints: vec![EndpointDescriptor {
                    address: 0x81,
                    direction: Direction::DeviceToHost,
                    transfer_kind: TransferKind::Interrupt,
                    max_packet_size: 8,
                }],
            }],
        }
    }

    pub fn with_interface(mut self, interface: InterfaceDescriptor) -> Self {
        self.interfaces.push(interface);
        self
    }
}

/// Create a printer-class interface with the given endpoints
pub fn create_printer_interface(
    number: u8,
    endpoints: Vec<EndpointDescriptor>,
) -> InterfaceDescriptor {
    InterfaceDescriptor {
        number,
        alternate_setting: 0,
        class_code: PRINTER_CLASS,
        sub_class_code: 0x01,
        protocol_code: 0x02,
        endpoints,
    }
}

/// Directory returning the first printer interface of a [`MockDevice`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDirectory;

impl DeviceDirectory<MockDevice> for MockDirectory {
    fn find_printer_interface(&self, device: &MockDevice) -> Option<InterfaceDescriptor> {
        device.interfaces.iter().find(|i| i.is_printer()).cloned()
    }
}

/// Call recorded by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Opened,
    Claimed { interface: u8, force: bool },
    RequestInitialized { id: u32, endpoint: u8 },
    Queued {
        id: u32,
        endpoint: u8,
        data: Vec<u8>,
    },
    Waited,
    RequestClosed { id: u32 },
    BulkTransfer {
        endpoint: u8,
        capacity: usize,
        timeout_ms: u64,
    },
    Closed,
}

/// Scripted outcome of one bulk IN transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResponse {
    /// Device sends these bytes
    Data(Vec<u8>),
    /// Transfer completes with zero bytes
    Empty,
    /// Transfer fails (timeout)
    Failed,
}

#[derive(Default)]
struct MockState {
    events: Vec<MockEvent>,
    reads: VecDeque<ReadResponse>,
    refuse_open: bool,
    refuse_claim: bool,
    refuse_initialize: bool,
    refuse_queue: bool,
    fail_wait: bool,
    next_request: u32,
    outstanding: Vec<u32>,
}

/// Opener handing out [`MockConnection`]s that share one event log
#[derive(Clone, Default)]
pub struct MockOpener {
    state: Arc<Mutex<MockState>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn set_refuse_open(&self, refuse: bool) {
        self.lock().refuse_open = refuse;
    }

    pub fn set_refuse_claim(&self, refuse: bool) {
        self.lock().refuse_claim = refuse;
    }

    pub fn set_refuse_initialize(&self, refuse: bool) {
        self.lock().refuse_initialize = refuse;
    }

    pub fn set_refuse_queue(&self, refuse: bool) {
        self.lock().refuse_queue = refuse;
    }

    pub fn set_fail_wait(&self, fail: bool) {
        self.lock().fail_wait = fail;
    }

    /// Script the next bulk IN transfer. Unscripted reads return `Empty`.
    pub fn push_read(&self, response: ReadResponse) {
        self.lock().reads.push_back(response);
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    pub fn count(&self, predicate: impl Fn(&MockEvent) -> bool) -> usize {
        self.lock().events.iter().filter(|e| predicate(*e)).count()
    }

    /// Payloads of every queued request, in order
    pub fn queued_payloads(&self) -> Vec<Vec<u8>> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Queued { data, .. } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Requests queued but neither completed nor cancelled
    pub fn outstanding_requests(&self) -> Vec<u32> {
        self.lock().outstanding.clone()
    }

    /// Requests initialized but not yet released
    pub fn unreleased_requests(&self) -> Vec<u32> {
        let state = self.lock();
        let mut live = Vec::new();
        for event in &state.events {
            match event {
                MockEvent::RequestInitialized { id, .. } => live.push(*id),
                MockEvent::RequestClosed { id } => live.retain(|l| l != id),
                _ => {}
            }
        }
        live
    }
}

impl ConnectionOpener<MockDevice> for MockOpener {
    type Connection = MockConnection;

    fn open(&self, _device: &MockDevice) -> Result<MockConnection, BackendError> {
        let mut state = self.lock();
        if state.refuse_open {
            return Err("permission denied".into());
        }
        state.events.push(MockEvent::Opened);
        Ok(MockConnection {
            state: self.state.clone(),
        })
    }
}

/// Handle returned by [`MockConnection::initialize_request`]
#[derive(Debug)]
pub struct MockRequest {
    id: u32,
    endpoint: u8,
}

/// Connection recording into its opener's log
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }
}

impl Connection for MockConnection {
    type Request = MockRequest;

    fn claim_interface(
        &mut self,
        interface: &InterfaceDescriptor,
        force: bool,
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.refuse_claim {
            return Err("interface busy".into());
        }
        state.events.push(MockEvent::Claimed {
            interface: interface.number,
            force,
        });
        Ok(())
    }

    fn initialize_request(
        &mut self,
        endpoint: &EndpointDescriptor,
    ) -> Result<MockRequest, BackendError> {
        let mut state = self.lock();
        if state.refuse_initialize {
            return Err("request allocation failed".into());
        }
        state.next_request += 1;
        let id = state.next_request;
        state.events.push(MockEvent::RequestInitialized {
            id,
            endpoint: endpoint.address,
        });
        Ok(MockRequest {
            id,
            endpoint: endpoint.address,
        })
    }

    fn queue_request(
        &mut self,
        request: &mut MockRequest,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.refuse_queue {
            return Err("queue rejected".into());
        }
        state.outstanding.push(request.id);
        state.events.push(MockEvent::Queued {
            id: request.id,
            endpoint: request.endpoint,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn request_wait(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.events.push(MockEvent::Waited);
        if state.fail_wait {
            return Err("device stalled".into());
        }
        state.outstanding.clear();
        Ok(())
    }

    fn close_request(&mut self, request: MockRequest) {
        let mut state = self.lock();
        state.outstanding.retain(|id| *id != request.id);
        state.events.push(MockEvent::RequestClosed { id: request.id });
    }

    fn bulk_transfer(
        &mut self,
        endpoint: &EndpointDescriptor,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, BackendError> {
        let mut state = self.lock();
        state.events.push(MockEvent::BulkTransfer {
            endpoint: endpoint.address,
            capacity: buffer.len(),
            timeout_ms: timeout.as_millis() as u64,
        });
        match state.reads.pop_front().unwrap_or(ReadResponse::Empty) {
            ReadResponse::Data(data) => {
                let len = data.len().min(buffer.len());
                buffer[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            ReadResponse::Empty => Ok(0),
            ReadResponse::Failed => Err("timeout".into()),
        }
    }

    fn close(self) {
        self.lock().events.push(MockEvent::Closed);
    }
}
