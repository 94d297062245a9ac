//! Stage table and the path grammars it selects.

use super::path::PathError;

/// Deployment stage a request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Control,
    Psi,
    S3,
    V1,
    Default,
}

/// Every accepted stage name. `$default` is what HTTP APIs report for the
/// unnamed stage.
pub const STAGES: &[(&str, Stage)] = &[
    ("control", Stage::Control),
    ("psi", Stage::Psi),
    ("s3", Stage::S3),
    ("v1", Stage::V1),
    ("default", Stage::Default),
    ("$default", Stage::Default),
];

impl Stage {
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        STAGES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, stage)| *stage)
    }

    #[must_use]
    pub fn grammar(self) -> Grammar {
        match self {
            Self::Control => Grammar::Control,
            Self::Psi => Grammar::PsiRedirect,
            Self::S3 => Grammar::Retired,
            Self::V1 => Grammar::V1Mirror,
            Self::Default => Grammar::Current,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grammar {
    /// `snapshots`
    Control,
    /// `<a>/<b>/repodata/..` and `<a>/<b>/Packages/..`
    PsiRedirect,
    Retired,
    /// `<storage>/<platform>/<snapshot>/<path..>`
    V1Mirror,
    /// `enumerate[/<thread>]` and `mirror/<storage>/<platform>/<snapshot>/<path..>`
    Current,
}

/// Fixed redirect targets that need no store lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destinations {
    pub homepage: String,
    pub psi_base: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorRequest {
    pub storage: String,
    pub platform_id: String,
    pub snapshot: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Mirror(MirrorRequest),
    Enumerate { thread: Option<String> },
    Redirect { location: String },
}

impl Grammar {
    /// Matches decoded `segments` against this grammar.
    pub fn parse(
        self,
        segments: &[String],
        destinations: &Destinations,
    ) -> Result<Command, PathError> {
        match self {
            Self::Control => match segments {
                [only] if only == "snapshots" => Ok(Command::Enumerate { thread: None }),
                [first, ..] if first == "snapshots" => Err(PathError::BadArity {
                    command: "snapshots",
                    expected: "no arguments",
                }),
                [first, ..] => Err(PathError::UnknownCommand(first.clone())),
                [] => Err(PathError::EmptySegment),
            },
            Self::PsiRedirect => parse_psi(segments, &destinations.psi_base),
            Self::Retired => Err(PathError::RetiredStage("s3".to_string())),
            Self::V1Mirror => parse_mirror("v1 mirror", segments),
            Self::Current => match segments {
                [command] if command == "enumerate" => Ok(Command::Enumerate { thread: None }),
                [command, thread] if command == "enumerate" => Ok(Command::Enumerate {
                    thread: Some(thread.clone()),
                }),
                [command, ..] if command == "enumerate" => Err(PathError::BadArity {
                    command: "enumerate",
                    expected: "at most one thread id",
                }),
                [command, rest @ ..] if command == "mirror" => parse_mirror("mirror", rest),
                [command, ..] => Err(PathError::UnknownCommand(command.clone())),
                [] => Err(PathError::EmptySegment),
            },
        }
    }
}

fn parse_mirror(command: &'static str, segments: &[String]) -> Result<Command, PathError> {
    match segments {
        [storage, platform_id, snapshot, path @ ..] if !path.is_empty() => {
            Ok(Command::Mirror(MirrorRequest {
                storage: storage.clone(),
                platform_id: platform_id.clone(),
                snapshot: snapshot.clone(),
                path: path.join("/"),
            }))
        }
        _ => Err(PathError::BadArity {
            command,
            expected: "<storage>/<platform>/<snapshot>/<path>",
        }),
    }
}

fn parse_psi(segments: &[String], base: &str) -> Result<Command, PathError> {
    let location = match segments {
        [_, b, kind, rest @ ..] if kind == "repodata" => {
            join_location(base, ["repo", b.as_str(), "repodata"], rest)
        }
        [a, _, kind, rest @ ..] if kind == "Packages" => {
            join_location(base, ["rpm", a.as_str(), "Packages"], rest)
        }
        [_, _, kind, ..] => return Err(PathError::UnknownCommand(kind.clone())),
        _ => {
            return Err(PathError::BadArity {
                command: "psi",
                expected: "<a>/<b>/repodata or <a>/<b>/Packages",
            })
        }
    };
    Ok(Command::Redirect { location })
}

/// Re-encodes every segment so decoded `/` or spaces survive the redirect.
fn join_location(base: &str, head: [&str; 3], rest: &[String]) -> String {
    let mut location = base.trim_end_matches('/').to_string();
    for segment in head.into_iter().chain(rest.iter().map(String::as_str)) {
        location.push('/');
        location.push_str(&urlencoding::encode(segment));
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::path::split_segments;

    fn destinations() -> Destinations {
        Destinations {
            homepage: "https://home.example".to_string(),
            psi_base: "https://psi.example/rpmci".to_string(),
        }
    }

    fn parse(stage: &str, path: &str) -> Result<Command, PathError> {
        let stage = Stage::lookup(stage).expect("stage");
        let segments = split_segments(path)?;
        stage.grammar().parse(&segments, &destinations())
    }

    fn mirror(storage: &str, platform_id: &str, snapshot: &str, path: &str) -> Command {
        Command::Mirror(MirrorRequest {
            storage: storage.to_string(),
            platform_id: platform_id.to_string(),
            snapshot: snapshot.to_string(),
            path: path.to_string(),
        })
    }

    #[test]
    fn stage_table_is_closed() {
        assert_eq!(Stage::lookup("default"), Some(Stage::Default));
        assert_eq!(Stage::lookup("$default"), Some(Stage::Default));
        assert_eq!(Stage::lookup("v2"), None);
        assert_eq!(Stage::lookup("Default"), None);
    }

    #[test]
    fn current_grammar_mirror_and_enumerate() {
        assert_eq!(
            parse("default", "mirror/public/f40/f40-20240101/repodata/repomd.xml"),
            Ok(mirror("public", "f40", "f40-20240101", "repodata/repomd.xml"))
        );
        assert_eq!(
            parse("default", "enumerate"),
            Ok(Command::Enumerate { thread: None })
        );
        assert_eq!(
            parse("default", "enumerate/f40"),
            Ok(Command::Enumerate {
                thread: Some("f40".to_string())
            })
        );
        assert_eq!(
            parse("default", "enumerate/a/b"),
            Err(PathError::BadArity {
                command: "enumerate",
                expected: "at most one thread id",
            })
        );
        assert_eq!(
            parse("default", "mirror/public/f40/snap"),
            Err(PathError::BadArity {
                command: "mirror",
                expected: "<storage>/<platform>/<snapshot>/<path>",
            })
        );
        assert_eq!(
            parse("default", "status"),
            Err(PathError::UnknownCommand("status".to_string()))
        );
    }

    #[test]
    fn encoded_slash_reaches_the_command_intact() {
        assert_eq!(
            parse("default", "mirror/public/f40/snap/dir%2Ffile.rpm"),
            Ok(mirror("public", "f40", "snap", "dir/file.rpm"))
        );
        assert_eq!(
            parse("default", "enumerate/f40%2Fx"),
            Ok(Command::Enumerate {
                thread: Some("f40/x".to_string())
            })
        );
    }

    #[test]
    fn v1_grammar_has_no_command_word() {
        assert_eq!(
            parse("v1", "anon/el8/el8-20200101/Packages/a.rpm"),
            Ok(mirror("anon", "el8", "el8-20200101", "Packages/a.rpm"))
        );
        assert!(parse("v1", "anon/el8/el8-20200101").is_err());
    }

    #[test]
    fn control_grammar_only_knows_snapshots() {
        assert_eq!(
            parse("control", "snapshots"),
            Ok(Command::Enumerate { thread: None })
        );
        assert!(parse("control", "snapshots/f40").is_err());
        assert_eq!(
            parse("control", "enumerate"),
            Err(PathError::UnknownCommand("enumerate".to_string()))
        );
    }

    #[test]
    fn psi_grammar_redirects_into_legacy_layout() {
        assert_eq!(
            parse("psi", "el8/el8-base/repodata/repomd.xml"),
            Ok(Command::Redirect {
                location: "https://psi.example/rpmci/repo/el8-base/repodata/repomd.xml"
                    .to_string()
            })
        );
        assert_eq!(
            parse("psi", "el8/el8-base/Packages/a%20b.rpm"),
            Ok(Command::Redirect {
                location: "https://psi.example/rpmci/rpm/el8/Packages/a%20b.rpm".to_string()
            })
        );
        assert_eq!(
            parse("psi", "el8/el8-base/repodata"),
            Ok(Command::Redirect {
                location: "https://psi.example/rpmci/repo/el8-base/repodata".to_string()
            })
        );
        assert!(parse("psi", "el8/el8-base/other").is_err());
        assert!(parse("psi", "el8/repodata").is_err());
    }

    #[test]
    fn s3_stage_is_retired() {
        assert_eq!(
            parse("s3", "anything/at/all"),
            Err(PathError::RetiredStage("s3".to_string()))
        );
    }
}
