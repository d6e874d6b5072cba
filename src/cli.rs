use clap::{Parser, Subcommand};

use crate::models::workshop::WorkshopFields;

/// tirebook: tire-change availability and booking service
#[derive(Parser)]
#[command(name = "tirebook", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to TIREBOOK_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply database migrations and exit
    Migrate,

    /// Manage configured workshops
    Workshop {
        #[command(subcommand)]
        command: WorkshopCommands,
    },
}

#[derive(Subcommand)]
pub enum WorkshopCommands {
    /// List workshops (active only unless --all)
    List {
        #[arg(long)]
        all: bool,
    },
    /// Register a new workshop
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        address: String,
        /// Comma-separated, e.g. "Car,Truck"
        #[arg(long)]
        vehicle_types: String,
        #[arg(long, help = "Availability URL with {date_from} and {date_to}")]
        url_available_times: String,
        #[arg(long, help = "JSON_id or XML_uuid")]
        response_type: String,
        #[arg(long, help = "Booking URL with {id}")]
        url_booking: String,
        #[arg(long, default_value = "POST")]
        booking_http_method: String,
        #[arg(long, help = "Booking body with {contact_info}")]
        booking_body: String,
    },
    /// Flip a workshop between active and inactive
    Toggle { id: i64 },
}

impl WorkshopCommands {
    /// Fields for `Add`; `None` for the other subcommands.
    pub fn into_fields(self) -> Option<WorkshopFields> {
        match self {
            WorkshopCommands::Add {
                name,
                city,
                address,
                vehicle_types,
                url_available_times,
                response_type,
                url_booking,
                booking_http_method,
                booking_body,
            } => Some(WorkshopFields {
                name: Some(name),
                city: Some(city),
                address: Some(address),
                vehicle_types: Some(vehicle_types),
                url_available_times: Some(url_available_times),
                response_type: Some(response_type),
                url_booking: Some(url_booking),
                booking_http_method: Some(booking_http_method),
                booking_body: Some(booking_body),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workshop_add_parses_into_fields() {
        let cli = Cli::try_parse_from([
            "tirebook",
            "workshop",
            "add",
            "--name",
            "Manchester Tyres",
            "--city",
            "Manchester",
            "--address",
            "14 Bury Rd",
            "--vehicle-types",
            "Car,Truck",
            "--url-available-times",
            "http://localhost:9004/slots?from={date_from}&until={date_to}",
            "--response-type",
            "JSON_id",
            "--url-booking",
            "http://localhost:9004/slots/{id}/booking",
            "--booking-body",
            r#"{"contactInformation":"{contact_info}"}"#,
        ])
        .unwrap();

        let Some(Commands::Workshop { command }) = cli.command else {
            panic!("expected workshop subcommand");
        };
        let fields = command.into_fields().unwrap();
        assert_eq!(fields.booking_http_method.as_deref(), Some("POST"));
        assert_eq!(fields.response_type.as_deref(), Some("JSON_id"));
    }

    #[test]
    fn test_serve_port_is_optional() {
        let cli = Cli::try_parse_from(["tirebook", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: None })));
    }
}
