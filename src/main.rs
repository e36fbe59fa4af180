#![forbid(unsafe_code)]

use anyhow::Result;
use connstore::cli::{self, CliCommand};
use connstore::daemon::ipc::{IpcClient, IpcMessage, IpcServer};
use connstore::daemon::run_daemon_with_config;
use connstore::output::{print_response, Rendering};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::parse_args()?;

    let request_id = IpcServer::generate_request_id();
    let (message, rendering) = match args.command {
        CliCommand::Daemon { config } => return run_daemon_with_config(config).await,
        CliCommand::Services => (
            IpcMessage::ListServices { request_id },
            Rendering::NameList {
                empty: "No services with stored settings.",
            },
        ),
        CliCommand::Providers => (
            IpcMessage::ListProviders { request_id },
            Rendering::NameList {
                empty: "No providers with stored settings.",
            },
        ),
        CliCommand::ShowService { service_id } => {
            (IpcMessage::LoadService { request_id, service_id }, Rendering::Document)
        }
        CliCommand::RemoveService { service_id } => {
            (IpcMessage::RemoveService { request_id, service_id }, Rendering::Message)
        }
        CliCommand::RemoveProvider { ident } => (IpcMessage::RemoveProvider { request_id, ident }, Rendering::Message),
        CliCommand::Status => (IpcMessage::GetStatus { request_id }, Rendering::Status),
        CliCommand::Stop => (IpcMessage::Shutdown { request_id }, Rendering::Message),
    };

    let response = IpcClient::new(args.socket_path).send(&message).await?;
    print_response(response, rendering, args.json_output)
}
