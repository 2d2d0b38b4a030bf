use std::io;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

/// DSMR 4.0/4.2 P1 port line configuration: 115200 8N1.
pub const BAUD_RATE: u32 = 115_200;

pub fn open(dev: &str) -> io::Result<SerialStream> {
    tokio_serial::new(dev, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}
