use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{char, digit1, hex_digit1, one_of};
use nom::combinator::{all_consuming, map, map_res};
use nom::error::{convert_error, VerboseError};
use nom::sequence::preceded;
use nom::{Finish, IResult};
use synacor_emulator::constants as C;
use synacor_emulator::runtime::Reg;
use thiserror::Error;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// A number literal, decimal or hexadecimal (`0x` prefixed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Number(pub C::Word);

/// Something that can be assigned a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    Register(Reg),
    Address(C::Address),
}

#[derive(Debug, Error)]
#[error("could not parse argument: {0}")]
pub struct ParseArgumentError(String);

fn parse_hexadecimal(input: &str) -> Res<'_, C::Word> {
    preceded(
        tag_no_case("0x"),
        map_res(hex_digit1, |digits| C::Word::from_str_radix(digits, 16)),
    )(input)
}

fn parse_decimal(input: &str) -> Res<'_, C::Word> {
    map_res(digit1, C::Word::from_str)(input)
}

pub(crate) fn parse_number(input: &str) -> Res<'_, C::Word> {
    alt((parse_hexadecimal, parse_decimal))(input)
}

pub(crate) fn parse_register(input: &str) -> Res<'_, Reg> {
    map_res(preceded(char('r'), one_of("01234567")), |index: char| {
        format!("r{index}").parse::<Reg>()
    })(input)
}

fn parse_assignment_target(input: &str) -> Res<'_, AssignmentTarget> {
    alt((
        map(parse_register, AssignmentTarget::Register),
        // Addresses of the mapped registers name the registers themselves
        map(parse_number, |address| {
            Reg::from_address(address).map_or(
                AssignmentTarget::Address(address),
                AssignmentTarget::Register,
            )
        }),
    ))(input)
}

fn parse_complete<'a, T>(
    input: &'a str,
    parser: impl FnMut(&'a str) -> Res<'a, T>,
) -> Result<T, ParseArgumentError> {
    all_consuming(parser)(input)
        .finish()
        .map(|(_, value)| value)
        .map_err(|e| ParseArgumentError(convert_error(input, e)))
}

impl FromStr for Number {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_complete(s, parse_number).map(Number)
    }
}

impl FromStr for AssignmentTarget {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_complete(s, parse_assignment_target)
    }
}
