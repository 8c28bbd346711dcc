// Servo sweep diagnostic: walks one logical channel through its angle range
// against the mock chip and prints the routing plus duty values, so wiring
// and pulse limits can be sanity-checked before powering real servos.
//
// Usage: cargo run --example servo_sweep -- --channel 31

use clap::Parser;

use hexapod_runtime::hw::mock::MockPwm;
use hexapod_runtime::hw::{ChipId, PwmChip};
use hexapod_runtime::servo::{ChannelRouter, PulseMapper};

#[derive(Parser, Debug)]
#[command(about = "Sweep one logical servo channel through 0-180 degrees")]
struct Args {
    /// Logical channel 0-31.
    #[arg(long, default_value_t = 0)]
    channel: u8,

    /// Degrees between steps.
    #[arg(long, default_value_t = 15.0)]
    step: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let router = ChannelRouter::hexapod();
    let mapper = PulseMapper::default();

    let route = router.route(args.channel)?;
    println!(
        "logical {} -> chip {:?} channel {}",
        args.channel, route.chip, route.channel
    );

    let mut chip = match route.chip {
        ChipId::A => MockPwm::new(ChipId::A),
        ChipId::B => MockPwm::new(ChipId::B),
    };

    let mut angle = 0.0_f32;
    while angle <= 180.0 {
        let pulse = mapper.angle_to_pulse_us(angle)?;
        let duty = mapper.angle_to_duty(angle)?;
        chip.set_duty(route.channel, duty)?;
        println!("{angle:>5.1} deg  {pulse:>6.1} us  duty {:>4}", duty.off);
        angle += args.step;
    }

    let sentinel = mapper.disable();
    chip.set_duty(route.channel, sentinel)?;
    println!("disable sentinel: on={} off=0x{:04x}", sentinel.on, sentinel.off);

    Ok(())
}
