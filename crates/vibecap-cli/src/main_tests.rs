//! CLI argument parsing tests

use clap::{CommandFactory, Parser};

use crate::{Cli, Commands, OutputFormat, PostAction, SessionAction};

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_post_create_args() {
    let cli = Cli::try_parse_from([
        "vibecap", "post", "create", "beach.jpg", "--user", "sam", "-v", "Fun", "--tags",
        "sea, sun", "--public",
    ])
    .unwrap();

    match cli.command {
        Commands::Post {
            action:
                PostAction::Create {
                    image,
                    user,
                    vibe,
                    tags,
                    public,
                    ..
                },
        } => {
            assert_eq!(image.to_str(), Some("beach.jpg"));
            assert_eq!(user, "sam");
            assert_eq!(vibe.as_deref(), Some("Fun"));
            assert_eq!(tags.as_deref(), Some("sea, sun"));
            assert!(public);
        }
        _ => panic!("expected post create"),
    }
}

#[test]
fn test_post_list_defaults() {
    let cli = Cli::try_parse_from(["vibecap", "post", "list", "-u", "sam"]).unwrap();
    match cli.command {
        Commands::Post {
            action:
                PostAction::List {
                    sort,
                    order,
                    page,
                    limit,
                    ..
                },
        } => {
            assert_eq!(sort, "createdAt");
            assert_eq!(order, "desc");
            assert_eq!(page, 1);
            assert_eq!(limit, 50);
        }
        _ => panic!("expected post list"),
    }
}

#[test]
fn test_bulk_update_requires_ids() {
    assert!(Cli::try_parse_from(["vibecap", "post", "bulk-update", "--user", "sam"]).is_err());
    assert!(Cli::try_parse_from(["vibecap", "post", "update", "not-a-uuid", "--user", "sam"]).is_err());
}

#[test]
fn test_session_set_and_global_format() {
    let cli = Cli::try_parse_from([
        "vibecap", "session", "set", "--timeout", "15", "--warnings", "false", "--format", "json",
    ])
    .unwrap();
    assert!(cli.format == OutputFormat::Json);
    match cli.command {
        Commands::Session {
            action:
                SessionAction::Set {
                    timeout, warnings, ..
                },
        } => {
            assert_eq!(timeout, Some(15));
            assert_eq!(warnings, Some(false));
        }
        _ => panic!("expected session set"),
    }
}
