// End-to-end lifecycle of the control loop against mock hardware: bias
// calibration, walking, stop, relax and shutdown, observed purely through
// the command mailbox and the telemetry watch channel.

use std::path::PathBuf;

use tokio::sync::mpsc;

use hexapod_runtime::gait::GaitPattern;
use hexapod_runtime::hw::mock::{MockImu, MockPower, SharedPwm};
use hexapod_runtime::hw::ChipId;
use hexapod_runtime::messages::{ChipHealth, Command, MoveIntent};
use hexapod_runtime::runtime::{Hardware, Runtime};

fn forward() -> Command {
    Command::Move(MoveIntent {
        x: 0.0,
        y: 20.0,
        rotate: 0.0,
        speed: 5,
        pattern: GaitPattern::Tripod,
    })
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle_through_the_mailbox() {
    let chip_a = SharedPwm::new(ChipId::A);
    let chip_b = SharedPwm::new(ChipId::B);
    let hw = Hardware {
        chip_a: Box::new(chip_a.clone()),
        chip_b: Box::new(chip_b.clone()),
        imu: Box::new(MockImu::level()),
        power: Box::new(MockPower::default()),
    };

    let (runtime, mut telemetry) = Runtime::new(hw, PathBuf::from("/nonexistent/cal.txt"));
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(8);
    let loop_task = tokio::spawn(runtime.run(cmd_rx));

    // Calibration never loaded: the warning flag must be up from the start.
    telemetry.changed().await.unwrap();
    assert!(telemetry.borrow().calibration_warning);

    // Walk. The loop first spends the bias-calibration ticks, then picks up
    // the command and leaves idle.
    cmd_tx.send(forward()).await.unwrap();
    loop {
        telemetry.changed().await.unwrap();
        let snapshot = telemetry.borrow_and_update().clone();
        if !snapshot.idle {
            assert_eq!(snapshot.pattern, GaitPattern::Tripod);
            assert_eq!(snapshot.chip_a, ChipHealth::Ok);
            break;
        }
    }

    // Walking must actually reach the servos.
    assert!(chip_a.lock().write_count > 0);
    assert!(chip_b.lock().write_count > 0);

    // Stop, then relax. Commands are applied one per tick, in order.
    cmd_tx.send(Command::Stop).await.unwrap();
    cmd_tx.send(Command::Relax).await.unwrap();
    loop {
        telemetry.changed().await.unwrap();
        let snapshot = telemetry.borrow_and_update().clone();
        if snapshot.relaxed {
            assert!(snapshot.idle);
            break;
        }
    }

    // Every channel on both chips got the disable sentinel.
    for chip in [&chip_a, &chip_b] {
        let mock = chip.lock();
        for duty in mock.last_duty {
            let duty = duty.expect("channel never written");
            assert!(duty.is_disable());
        }
    }

    // Closing the mailbox shuts the loop down.
    drop(cmd_tx);
    loop_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stale_intent_watchdog_holds_stance() {
    let chip_a = SharedPwm::new(ChipId::A);
    let chip_b = SharedPwm::new(ChipId::B);
    let hw = Hardware {
        chip_a: Box::new(chip_a.clone()),
        chip_b: Box::new(chip_b.clone()),
        imu: Box::new(MockImu::level()),
        power: Box::new(MockPower::default()),
    };

    let (runtime, mut telemetry) = Runtime::new(hw, PathBuf::from("/nonexistent/cal.txt"));
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(8);
    let loop_task = tokio::spawn(runtime.run(cmd_rx));

    cmd_tx.send(forward()).await.unwrap();
    loop {
        telemetry.changed().await.unwrap();
        if !telemetry.borrow_and_update().idle {
            break;
        }
    }

    // Stop commanding entirely; the watchdog must park the gait rather than
    // walking forever.
    loop {
        telemetry.changed().await.unwrap();
        let snapshot = telemetry.borrow_and_update().clone();
        if snapshot.idle {
            assert!(!snapshot.relaxed, "watchdog must hold, not relax");
            break;
        }
    }

    drop(cmd_tx);
    loop_task.await.unwrap();
}
