use spikelink_exec::ExecutorConfig;
use spikelink_hub::{HubConfig, HubSession, Port};

use crate::cmd::{link, InitArgs};
use crate::exit::{hub_error, CliResult, SUCCESS};
use crate::output::{print_init, OutputFormat};

pub fn run(args: InitArgs, format: OutputFormat) -> CliResult<i32> {
    let config = hub_config(&args)?;
    let link = link::open(&args.link, ExecutorConfig::default())?;

    let mut session = HubSession::with_config(link.executor.clone(), config);
    session
        .initialize()
        .map_err(|err| hub_error("initialize failed", err))?;
    if let Some(text) = &args.text {
        session
            .display_text(text)
            .map_err(|err| hub_error("display failed", err))?;
    }

    print_init(&link.device, session.config(), &link.executor.stats(), format);
    link.close();
    Ok(SUCCESS)
}

fn hub_config(args: &InitArgs) -> CliResult<HubConfig> {
    let parse = |s: &str| {
        s.parse::<Port>()
            .map_err(|err| hub_error("bad port", err))
    };
    let motors = args
        .motors
        .iter()
        .map(|m| parse(m))
        .collect::<CliResult<Vec<_>>>()?;
    let color_sensor_port = if args.no_color_sensor {
        None
    } else {
        Some(parse(&args.color_sensor)?)
    };
    let distance_sensor_port = if args.no_distance_sensor {
        None
    } else {
        Some(parse(&args.distance_sensor)?)
    };
    Ok(HubConfig {
        motors,
        color_sensor_port,
        distance_sensor_port,
    })
}
