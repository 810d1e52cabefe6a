use bytebus::{
    AccessFault, BusError, BusOwner, DmaError, DmaState, DmaTransferConfig, Machine,
    MachineBuilder, Tick,
};
use tracing_subscriber::fmt;

#[cfg(test)]
#[ctor::ctor]
fn init() {
    let fmt_subscriber = fmt::Subscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(fmt_subscriber)
        .expect("Unable to set global tracing subscriber");
}

fn get_machine() -> Machine {
    MachineBuilder::new().build().unwrap()
}

#[test]
fn test_write_transfer() {
    let mut machine = get_machine();
    machine
        .configure_dma(DmaTransferConfig::write(0x0100, 4, 0xA5))
        .unwrap();
    assert_eq!(machine.dma().state(), DmaState::DmaRequested);
    // the bus is only taken on the first step
    assert_eq!(machine.arbiter().owner(), BusOwner::Cpu);

    let mut steps = 0;
    while machine.step_dma().unwrap() != DmaState::DmaComplete {
        steps += 1;
        assert!(steps < 10, "transfer never completed");
    }

    assert_eq!(
        machine.snapshot(0x00FF, 0x0105).unwrap(),
        vec![0x00, 0xA5, 0xA5, 0xA5, 0xA5, 0x00, 0x00]
    );
    assert_eq!(machine.arbiter().owner(), BusOwner::Cpu);
    assert!(machine.acknowledge_dma());
    assert_eq!(machine.dma().state(), DmaState::Idle);
    assert!(machine.dma().transfer().is_none());
}

#[test]
fn test_cpu_is_refused_while_dma_active() {
    let mut machine = get_machine();
    machine
        .configure_dma(DmaTransferConfig::write(0x0100, 4, 0x11))
        .unwrap();

    // still requested, the CPU keeps the bus
    assert_eq!(machine.cpu_read(0x0100), Ok(0x00));

    assert_eq!(machine.step_dma(), Ok(DmaState::DmaActive));
    let busy = BusError::BusBusy {
        owner: BusOwner::Dma,
    };
    for _ in 0..4 {
        assert_eq!(machine.dma().state(), DmaState::DmaActive);
        assert_eq!(machine.cpu_read(0x0100), Err(busy));
        assert_eq!(machine.cpu_write(0x0200, 0x01), Err(busy));
        assert_eq!(machine.cpu_read_word(0x8000), Err(busy));
        assert_eq!(machine.cpu_write_word(0x0300, 0x0102), Err(busy));
        machine.step_dma().unwrap();
    }

    assert_eq!(machine.dma().state(), DmaState::DmaComplete);
    assert_eq!(machine.cpu_read(0x0103), Ok(0x11));
    assert_eq!(machine.cpu_read(0x0200), Ok(0x00));
}

#[test]
fn test_inspection_is_refused_while_dma_active() {
    let mut machine = get_machine();
    machine.cpu_write(0x0100, 0x5A).unwrap();
    machine
        .configure_dma(DmaTransferConfig::write(0x0100, 2, 0x00))
        .unwrap();
    assert_eq!(machine.step_dma(), Ok(DmaState::DmaActive));

    let busy = BusError::BusBusy {
        owner: BusOwner::Dma,
    };
    assert_eq!(machine.cpu_read(0x0100), Err(busy));
    assert_eq!(machine.cpu_read_word(0x0100), Err(busy));
    assert_eq!(machine.snapshot(0x0100, 0x0100), Err(busy));
    assert_eq!(machine.memory(), Err(busy));
    assert_eq!(machine.memory_dump(0x0100, 0x0101), Err(busy));

    while machine.tick().unwrap() != Tick::Dma(DmaState::DmaComplete) {}
    assert_eq!(machine.snapshot(0x0100, 0x0101), Ok(vec![0x00, 0x00]));
}

#[test]
fn test_abort_on_protected_region() {
    let mut machine = get_machine();
    machine
        .configure_dma(DmaTransferConfig::write(0x7FFD, 6, 0x77))
        .unwrap();

    let err = loop {
        match machine.step_dma() {
            Ok(state) => assert_ne!(state, DmaState::DmaComplete),
            Err(err) => break err,
        }
    };

    assert_eq!(
        err,
        DmaError::Aborted {
            at_address: 0x8000,
            remaining: 3,
            cause: AccessFault::WriteProtected { address: 0x8000 },
        }
    );
    assert_eq!(
        machine.snapshot(0x7FFC, 0x8002).unwrap(),
        vec![0x00, 0x77, 0x77, 0x77, 0x00, 0x00, 0x00]
    );
    assert_eq!(machine.arbiter().owner(), BusOwner::Cpu);
    assert_eq!(machine.dma().state(), DmaState::Idle);
    assert!(machine.cpu_write(0x0100, 0x01).is_ok());

    // the caller may resume from the failing address
    machine
        .configure_dma(DmaTransferConfig::read(0x8000, 3))
        .unwrap();
    while machine.tick().unwrap() != Tick::Dma(DmaState::DmaComplete) {}
    assert_eq!(machine.dma_mut().take_read_bytes(), vec![0x00, 0x00, 0x00]);
}

#[test]
fn test_abort_into_locked_firmware() {
    let mut machine = get_machine();
    machine
        .configure_dma(DmaTransferConfig::write(0x0000, 2, 0xEE))
        .unwrap();

    assert_eq!(machine.step_dma(), Ok(DmaState::DmaActive));
    assert!(matches!(
        machine.step_dma(),
        Err(DmaError::Aborted {
            at_address: 0x0000,
            remaining: 2,
            ..
        })
    ));
    assert_eq!(machine.cpu_read(0x0000), Ok(0x04));
}

#[test]
fn test_read_transfer_feeds_pending_byte() {
    let mut machine = get_machine();
    machine.cpu_write(0x0400, 0x10).unwrap();
    machine.cpu_write(0x0401, 0x20).unwrap();

    machine
        .configure_dma(DmaTransferConfig::read(0x0400, 2))
        .unwrap();
    machine.step_dma().unwrap();
    machine.step_dma().unwrap();
    assert_eq!(machine.dma().pending_byte(), 0x10);
    machine.step_dma().unwrap();
    assert_eq!(machine.dma().pending_byte(), 0x20);
    assert_eq!(machine.dma_mut().take_read_bytes(), vec![0x10, 0x20]);
}

#[test]
fn test_write_transfer_with_changing_data() {
    let mut machine = get_machine();
    machine
        .configure_dma(DmaTransferConfig::write(0x0500, 3, 0x00))
        .unwrap();
    machine.step_dma().unwrap();

    for value in [0x0A, 0x0B, 0x0C] {
        machine.dma_mut().set_pending_byte(value);
        machine.step_dma().unwrap();
    }
    assert_eq!(machine.snapshot(0x0500, 0x0502).unwrap(), vec![0x0A, 0x0B, 0x0C]);
}

#[test]
fn test_control_loop_alternation() {
    let mut machine = get_machine();
    assert_eq!(machine.tick(), Ok(Tick::Cpu));

    machine
        .configure_dma(DmaTransferConfig::write(0x0100, 2, 0x01))
        .unwrap();
    assert_eq!(machine.tick(), Ok(Tick::Dma(DmaState::DmaActive)));
    assert_eq!(machine.tick(), Ok(Tick::Dma(DmaState::DmaActive)));
    assert_eq!(machine.tick(), Ok(Tick::Dma(DmaState::DmaComplete)));
    assert_eq!(machine.tick(), Ok(Tick::Cpu));
}

#[test]
fn test_invalid_configuration_does_not_take_bus() {
    let mut machine = get_machine();
    assert_eq!(
        machine.configure_dma(DmaTransferConfig::write(0xFFF0, 0x20, 0)),
        Err(DmaError::OutOfRange {
            start: 0xFFF0,
            length: 0x20
        })
    );
    assert_eq!(machine.tick(), Ok(Tick::Cpu));
    assert_eq!(machine.arbiter().owner(), BusOwner::Cpu);
}
