mod common;

use tessera::*;

fn staging(dev: &mut Device<NullDriver>) -> Handle<GPUBuffer> {
    dev.make_buffer(&BufferInfo {
        debug_name: "staging",
        byte_size: 16,
        kind: BufferKind::Uniform,
        usage: MemoryUsage::CPU_WRITE,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn write_lands_at_the_offset() {
    let mut dev = common::device();
    let b = staging(&mut dev);
    dev.write_buffer(b, 12, &[1, 2, 3, 4]).unwrap();

    let native = dev.get(b).unwrap().native();
    let contents = dev.driver().buffer_contents(native).unwrap();
    assert_eq!(&contents[12..], &[1, 2, 3, 4]);
}

#[test]
fn write_past_the_end_is_rejected() {
    let mut dev = common::device();
    let b = staging(&mut dev);
    assert!(matches!(
        dev.write_buffer(b, 13, &[0; 4]),
        Err(GPUError::InvalidInfo(_))
    ));
    assert!(matches!(
        dev.write_buffer(b, u64::MAX, &[0; 2]),
        Err(GPUError::InvalidInfo(_))
    ));
}

#[test]
fn gpu_only_buffers_cannot_be_written() {
    let mut dev = common::device();
    let b = dev
        .make_buffer(&BufferInfo {
            debug_name: "gpu only",
            byte_size: 16,
            ..Default::default()
        })
        .unwrap();
    assert!(dev.write_buffer(b, 0, &[1]).unwrap_err().is_contract_violation());
}
