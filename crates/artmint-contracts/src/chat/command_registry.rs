#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    pub arg_key: &'static str,
}

/// Commands whose whole remainder is taken verbatim as one argument.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "name",
        action: "set_name",
        arg_key: "name",
    },
    CommandSpec {
        command: "description",
        action: "set_description",
        arg_key: "description",
    },
    CommandSpec {
        command: "address",
        action: "set_address",
        arg_key: "address",
    },
    CommandSpec {
        command: "gateway",
        action: "gateway",
        arg_key: "uri",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "reset",
        action: "reset",
        arg_key: "",
    },
    CommandSpec {
        command: "restart",
        action: "restart",
        arg_key: "",
    },
    CommandSpec {
        command: "status",
        action: "status",
        arg_key: "",
    },
    CommandSpec {
        command: "help",
        action: "help",
        arg_key: "",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
        arg_key: "",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
        arg_key: "",
    },
];

pub(crate) const MINT_COMMAND: &str = "mint";
pub(crate) const MINT_FIELDS: [&str; 3] = ["name", "description", "address"];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "<prompt>",
    "/name",
    "/description",
    "/address",
    "/mint",
    "/reset",
    "/restart",
    "/status",
    "/gateway",
    "/help",
    "/quit",
];
