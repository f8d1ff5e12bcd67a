//! Command line → [`CurlOptions`]

use curlkit_domain::{CurlError, CurlOptions, Result};
use tracing::debug;

use super::flags::{self, FlagAction, FlagSpec};
use super::tokenizer::tokenize;

/// Parse a full curl command line
///
/// A leading `curl` word is optional. Flags are applied strictly left to
/// right, so any value a later flag sets replaces what an earlier one set.
///
/// # Errors
///
/// - [`CurlError::MalformedCommand`] for tokenizer failures, missing or bad
///   flag values, a second URL, or no URL at all
/// - [`CurlError::UnknownOption`] for flags not in the table
pub fn parse_command(command: &str) -> Result<CurlOptions> {
    let tokens = tokenize(command)?;
    let args = match tokens.split_first() {
        Some((first, rest)) if first == "curl" => rest,
        _ => &tokens[..],
    };
    parse_args(args)
}

/// Parse already-split arguments (without the leading `curl`)
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<CurlOptions> {
    let mut parser = ArgParser { args, position: 0, options: CurlOptions::default() };
    parser.run()?;

    let options = parser.options;
    if options.url.is_empty() {
        return Err(CurlError::malformed("", "no URL specified"));
    }
    debug!(url = %options.url, method = %options.effective_method(), "parsed curl command");
    Ok(options)
}

struct ArgParser<'a, S> {
    args: &'a [S],
    position: usize,
    options: CurlOptions,
}

impl<'a, S: AsRef<str>> ArgParser<'a, S> {
    fn run(&mut self) -> Result<()> {
        let mut options_ended = false;

        while let Some(arg) = self.next_arg() {
            if options_ended || arg == "-" || !arg.starts_with('-') {
                self.positional(arg)?;
            } else if arg == "--" {
                options_ended = true;
            } else if arg.starts_with("--") {
                self.long_flag(arg)?;
            } else {
                self.short_flags(arg)?;
            }
        }
        Ok(())
    }

    fn next_arg(&mut self) -> Option<&'a str> {
        let args: &'a [S] = self.args;
        let arg = args.get(self.position)?;
        self.position += 1;
        Some(arg.as_ref())
    }

    fn positional(&mut self, arg: &str) -> Result<()> {
        if !self.options.url.is_empty() {
            return Err(CurlError::malformed(arg, "only one URL is supported"));
        }
        self.options.url = arg.to_string();
        Ok(())
    }

    /// `--flag`, `--flag value` or `--flag=value`
    fn long_flag(&mut self, arg: &str) -> Result<()> {
        let (name, inline) = match arg.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (arg, None),
        };
        let spec = flags::lookup(name)
            .ok_or_else(|| CurlError::UnknownOption { flag: name.to_string() })?;

        match (spec.action, inline) {
            (FlagAction::Switch(apply), None) => {
                apply(&mut self.options);
                Ok(())
            }
            (FlagAction::Switch(_), Some(_)) => {
                Err(CurlError::malformed(arg, format!("{name} does not take a value")))
            }
            (FlagAction::Value(apply), Some(value)) => apply(&mut self.options, value),
            (FlagAction::Value(apply), None) => {
                let value = self.required_value(spec)?;
                apply(&mut self.options, &value)
            }
        }
    }

    /// `-x`, `-x value`, `-xvalue` and bundles such as `-sSL` or `-sXPOST`
    fn short_flags(&mut self, arg: &str) -> Result<()> {
        for (offset, short) in arg.char_indices().skip(1) {
            let spelling = format!("-{short}");
            let spec = flags::lookup(&spelling)
                .ok_or_else(|| CurlError::UnknownOption { flag: spelling.clone() })?;

            match spec.action {
                FlagAction::Switch(apply) => apply(&mut self.options),
                FlagAction::Value(apply) => {
                    let rest = &arg[offset + short.len_utf8()..];
                    let value =
                        if rest.is_empty() { self.required_value(spec)? } else { rest.to_string() };
                    return apply(&mut self.options, &value);
                }
            }
        }
        Ok(())
    }

    fn required_value(&mut self, spec: &FlagSpec) -> Result<String> {
        self.next_arg()
            .map(str::to_string)
            .ok_or_else(|| CurlError::malformed(spec.long, "option requires a value"))
    }
}
