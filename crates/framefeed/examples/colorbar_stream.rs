use std::time::Duration;

use framefeed::prelude::*;

fn main() -> Result<(), DeviceError> {
    tracing_subscriber::fmt::init();

    let device = Device::new(
        FeedConfig::new()
            .format(FourCc::RGB24)
            .resolution(320, 180)
            .frame_interval(1, 30),
    )?;

    for desc in device.enumerate_formats() {
        println!("[{}] {} {}", desc.index, desc.fourcc, desc.description);
    }
    println!(
        "streaming {:?} at {} s/frame ({:.1} fps), {} bytes per buffer",
        device.format(),
        device.frame_interval(),
        device.frame_interval().fps(),
        device.buffer_size()
    );

    for buffer in device.allocate_buffers(4) {
        device.queue_buffer(buffer)?;
    }
    device.start_stream()?;

    let mut frames = 0;
    while frames < 30 {
        let buffer = match device.dequeue_buffer_timeout(Duration::from_millis(200)) {
            Ok(buffer) => buffer,
            Err(DeviceError::WouldBlock) => continue,
            Err(err) => return Err(err),
        };
        let meta = *buffer.meta();
        let first = buffer.payload().get(..3).unwrap_or_default().to_vec();
        println!(
            "#{:02} seq={} ts={}us state={:?} first_px={:02x?}",
            frames,
            meta.sequence,
            meta.timestamp / 1_000,
            meta.state,
            first
        );
        frames += 1;
        device.queue_buffer(buffer)?;
    }

    device.stop_stream()?;
    let metrics = device.metrics();
    println!(
        "frames={} empty_ticks={} errors={} cancelled={}",
        metrics.frames, metrics.empty_ticks, metrics.fill_errors, metrics.cancelled
    );
    Ok(())
}
