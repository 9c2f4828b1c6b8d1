// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sshtool",
    version,
    about = "Run the same command, script or copy on many hosts at once over ssh",
    long_about = "sshtool fans a request out to every target host concurrently using the system ssh and scp.\nThe combined output of each host is collected, and hosts producing identical output\nare reported together, so a fleet of hundreds of machines yields a short summary.\nOccurrences of a host's own name are replaced with \"$SSHTOOL_TARGET\" before grouping\nunless --verbatim is given.",
    after_help = "EXAMPLES:\n  Run a command:             sshtool -t 'as1-11,as1-12' uptime\n  Several commands:          sshtool -t targets.txt 'cd /var/log' 'ls -la'\n  Run a local script:        sshtool -t targets.txt -f ./check.sh --quick\n  Copy, then run:            sshtool -t targets.txt -c ./bundle -f ./install.sh\n  Copy only:                 sshtool -t targets.txt -c ./bundle\n  Extra ssh options:         sshtool -o ConnectTimeout=5 -o User=ops uptime\n\nEXIT CODES:\n  0 success, 1 errors on a target or bad configuration, 10 temp dir setup failed,\n  20 temp dir cleanup failed, 30 capture file creation failed, 100 aborted"
)]
pub struct Cli {
    #[arg(
        short = 't',
        long,
        help = "Targets file or comma-separated list of targets in host[:port] format\nA file may list one 'host', 'host port' or 'host:port' per line,\nor contain ssh config style 'Host <name>' lines\n[default: from config, else ~/.config/sshtool/targets]"
    )]
    pub targets: Option<String>,

    #[arg(
        short = 'o',
        long = "option",
        value_name = "OPTION",
        help = "ssh option passed as '-o OPTION' to ssh and scp (repeatable)"
    )]
    pub options: Vec<String>,

    #[arg(short = 'i', long, help = "Identity file passed to ssh and scp with -i")]
    pub identity: Option<PathBuf>,

    #[arg(
        short = 'c',
        long = "copy",
        value_name = "FILE_OR_DIR",
        help = "File or directory copied to /tmp/<name> on every target first\nAn existing /tmp/<name> on the target is removed before copying"
    )]
    pub copy: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "script",
        value_name = "SCRIPT",
        help = "Local script to stage in /tmp and run on every target\nTrailing arguments are passed to the script"
    )]
    pub script: Option<PathBuf>,

    #[arg(long = "sshcommand", value_name = "PROGRAM", help = "Program used instead of ssh")]
    pub ssh_command: Option<String>,

    #[arg(long = "scpcommand", value_name = "PROGRAM", help = "Program used instead of scp")]
    pub scp_command: Option<String>,

    #[arg(
        long,
        help = "Report each target's output as produced, one block per target,\nwithout replacing the host name"
    )]
    pub verbatim: bool,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    #[arg(
        long,
        help = "Configuration file path [default: ~/.config/sshtool/config.yaml]"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMANDS",
        help = "Commands to run (joined with ';'), or the script arguments with -f"
    )]
    pub args: Vec<String>,
}
