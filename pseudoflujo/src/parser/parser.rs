use log::trace;

use super::lexer::{Token, TokenKind};
use crate::error::ParseError;
use crate::ir::{Configuracion, Instruccion, MAX_NESTING};

/// Turns a token stream into the top-level instruction sequence and the
/// configuration directives found anywhere in it.
pub fn parse_tokens(tokens: &[Token]) -> Result<(Vec<Instruccion>, Vec<Configuracion>), ParseError> {
    let mut parser = Parser::new(tokens);
    let instrucciones = parser.parse_block(None)?;
    Ok((instrucciones, parser.configuraciones))
}

#[derive(Debug, Clone, Copy)]
enum Bloque {
    Si,
    Sino,
    Mientras,
}

impl Bloque {
    fn name(&self) -> &'static str {
        match self {
            Self::Si => "SI",
            Self::Sino => "SINO",
            Self::Mientras => "MIENTRAS",
        }
    }

    fn terminator(&self) -> &'static str {
        match self {
            Self::Si | Self::Sino => "FINSI",
            Self::Mientras => "FINMIENTRAS",
        }
    }

    fn closes(&self, kind: &TokenKind) -> bool {
        match self {
            Self::Si => matches!(kind, TokenKind::FinSi | TokenKind::Sino),
            Self::Sino => matches!(kind, TokenKind::FinSi),
            Self::Mientras => matches!(kind, TokenKind::FinMientras),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum Nesting {
    Block,
    Operator,
}

pub(super) struct Parser<'a> {
    pub(super) tokens: &'a [Token],
    pub(super) position: usize,
    /// Open SI/MIENTRAS blocks around the position.
    blocks: usize,
    /// Open parentheses and unary operators inside the current expression.
    operators: usize,
    configuraciones: Vec<Configuracion>,
}

impl<'a> Parser<'a> {
    pub(super) fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
            blocks: 0,
            operators: 0,
            configuraciones: Vec::new(),
        }
    }

    /// Parses statements until end of input (top level) or until the token
    /// that closes `open`, which is left unconsumed.
    fn parse_block(&mut self, open: Option<(Bloque, usize)>) -> Result<Vec<Instruccion>, ParseError> {
        let mut body = Vec::new();

        loop {
            self.consume_newlines();

            match (self.peek_kind(), open) {
                (None | Some(TokenKind::Eof), None) => return Ok(body),
                (None | Some(TokenKind::Eof), Some((bloque, line))) => {
                    return Err(ParseError::UnterminatedBlock {
                        line,
                        block: bloque.name(),
                        terminator: bloque.terminator(),
                    });
                }
                (Some(kind), Some((bloque, _))) if bloque.closes(kind) => return Ok(body),
                (Some(TokenKind::FinSi | TokenKind::Sino | TokenKind::FinMientras), _) => {
                    return Err(self.unexpected("a statement"));
                }
                (Some(TokenKind::Config), _) => {
                    let config = self.parse_directive()?;
                    trace!("directive {config}");
                    self.configuraciones.push(config);
                }
                (Some(_), _) => body.push(self.parse_statement()?),
            }

            self.expect_line_end()?;
        }
    }

    fn parse_nested_block(&mut self, bloque: Bloque, line: usize) -> Result<Vec<Instruccion>, ParseError> {
        self.nested(Nesting::Block, line, |parser| parser.parse_block(Some((bloque, line))))
    }

    /// Runs `parse` one level deeper, refusing to go past [`MAX_NESTING`].
    pub(super) fn nested<T>(
        &mut self,
        nesting: Nesting,
        line: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let depth = match nesting {
            Nesting::Block => self.blocks,
            Nesting::Operator => self.operators,
        };
        if depth == MAX_NESTING {
            return Err(ParseError::TooDeep {
                line,
                limit: MAX_NESTING,
            });
        }
        self.set_depth(nesting, depth + 1);
        let result = parse(self);
        self.set_depth(nesting, depth);
        result
    }

    fn set_depth(&mut self, nesting: Nesting, depth: usize) {
        match nesting {
            Nesting::Block => self.blocks = depth,
            Nesting::Operator => self.operators = depth,
        }
    }

    fn parse_statement(&mut self) -> Result<Instruccion, ParseError> {
        let line = self.line();
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                self.advance(); // consume identifier
                self.expect(&TokenKind::Equal, "'=' after variable name")?;
                let value = self.parse_expression()?;
                Ok(Instruccion::asignar(name.clone(), value, line))
            }
            Some(TokenKind::Si) => self.parse_si(line),
            Some(TokenKind::Mientras) => {
                self.advance(); // consume 'MIENTRAS'
                let condition = self.parse_expression()?;
                self.expect_line_end()?;
                let body = self.parse_nested_block(Bloque::Mientras, line)?;
                self.advance(); // consume 'FINMIENTRAS'
                Ok(Instruccion::mientras(condition, body, line))
            }
            Some(TokenKind::Mostrar) => {
                self.advance(); // consume 'MOSTRAR'
                let value = self.parse_expression()?;
                Ok(Instruccion::mostrar(value, line))
            }
            Some(TokenKind::Leer) => {
                self.advance(); // consume 'LEER'
                match self.peek_kind() {
                    Some(TokenKind::Identifier(name)) => {
                        self.advance();
                        Ok(Instruccion::leer(name.clone(), line))
                    }
                    _ => Err(self.unexpected("a variable name after LEER")),
                }
            }
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_si(&mut self, line: usize) -> Result<Instruccion, ParseError> {
        self.advance(); // consume 'SI'
        let condition = self.parse_expression()?;
        self.expect_line_end()?;

        let then_branch = self.parse_nested_block(Bloque::Si, line)?;
        let else_branch = if matches!(self.peek_kind(), Some(TokenKind::Sino)) {
            self.advance(); // consume 'SINO'
            self.expect_line_end()?;
            Some(self.parse_nested_block(Bloque::Sino, line)?)
        } else {
            None
        };
        self.advance(); // consume 'FINSI'

        Ok(Instruccion::si(condition, then_branch, else_branch, line))
    }

    // Helpers

    pub(super) fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    pub(super) fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    pub(super) fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    pub(super) fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(1, |token| token.span.line)
    }

    pub(super) fn expect(&mut self, expected: &TokenKind, description: &str) -> Result<(), ParseError> {
        if self.peek_kind() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(description))
        }
    }

    pub(super) fn unexpected(&self, expected: &str) -> ParseError {
        let (span, found) = match self.peek() {
            Some(token) => (token.span, token.to_string()),
            None => (
                self.tokens.last().map(|token| token.span).unwrap_or_default(),
                "end of input".to_string(),
            ),
        };
        ParseError::Unexpected {
            line: span.line,
            column: span.column,
            expected: expected.to_string(),
            found,
        }
    }

    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Newline) => {
                self.advance();
                Ok(())
            }
            None | Some(TokenKind::Eof) => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn consume_newlines(&mut self) {
        while matches!(self.peek_kind(), Some(TokenKind::Newline)) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expression, TipoInstruccion};
    use crate::parser::lexer::tokenize;

    fn parse(source: &str) -> Result<(Vec<Instruccion>, Vec<Configuracion>), ParseError> {
        parse_tokens(&tokenize(source).unwrap())
    }

    #[test]
    fn scenario_assignment_then_si() {
        let (instrucciones, configs) = parse("x = 5\nSI x > 3\n  MOSTRAR x\nFINSI").unwrap();
        assert!(configs.is_empty());
        assert_eq!(instrucciones.len(), 2);

        assert_eq!(instrucciones[0].tipo, TipoInstruccion::Asignar);
        assert_eq!(instrucciones[0].argumento, "x");
        assert_eq!(instrucciones[0].expresion, Some(Expression::Integer(5)));

        let si = &instrucciones[1];
        assert_eq!(si.tipo, TipoInstruccion::Si);
        assert_eq!(si.argumento, "x > 3");
        assert_eq!(si.linea, 2);
        let bloque = si.bloque.as_ref().unwrap();
        assert_eq!(bloque.len(), 1);
        assert_eq!(bloque[0].tipo, TipoInstruccion::Mostrar);
        assert_eq!(bloque[0].argumento, "x");
        assert_eq!(bloque[0].linea, 3);
    }

    #[test]
    fn nested_blocks_and_sino() {
        let source = "\
MIENTRAS i < 3
  SI i MOD 2 = 0
    MOSTRAR \"par\"
  SINO
    MOSTRAR \"impar\"
  FINSI
  i = i + 1
FINMIENTRAS
";
        let (instrucciones, _) = parse(source).unwrap();
        assert_eq!(instrucciones.len(), 1);
        let cuerpo = instrucciones[0].bloque.as_ref().unwrap();
        assert_eq!(cuerpo.len(), 2);
        assert_eq!(cuerpo[0].bloque.as_ref().unwrap().len(), 1);
        assert_eq!(cuerpo[0].bloque_sino.as_ref().unwrap()[0].argumento, "\"impar\"");
        assert_eq!(cuerpo[1].tipo, TipoInstruccion::Asignar);
    }

    #[test]
    fn missing_terminator_is_unterminated_block() {
        let err = parse("x = 1\nMIENTRAS x < 3\n  x = x + 1\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnterminatedBlock {
                line: 2,
                block: "MIENTRAS",
                terminator: "FINMIENTRAS"
            }
        );

        let err = parse("SI VERDADERO\nSINO\nMOSTRAR 1").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedBlock { block: "SINO", .. }));
    }

    #[test]
    fn stray_terminators_are_rejected() {
        assert!(matches!(parse("FINSI"), Err(ParseError::Unexpected { .. })));
        assert!(matches!(
            parse("MIENTRAS VERDADERO\nFINSI"),
            Err(ParseError::Unexpected { .. })
        ));
        assert!(matches!(
            parse("SI VERDADERO\nSINO\nSINO\nFINSI"),
            Err(ParseError::Unexpected { .. })
        ));
    }

    #[test]
    fn statements_end_at_line_end() {
        let err = parse("x = 1 2").unwrap_err();
        assert_eq!(
            err,
            ParseError::Unexpected {
                line: 1,
                column: 7,
                expected: "end of line".into(),
                found: "'2'".into()
            }
        );
    }

    #[test]
    fn assignment_needs_equal_sign() {
        let err = parse("x 5").unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { ref expected, .. } if expected.contains("'='")));
    }

    #[test]
    fn leer_needs_a_variable() {
        assert!(parse("LEER 5").is_err());
        let (instrucciones, _) = parse("LEER edad").unwrap();
        assert_eq!(instrucciones[0].tipo, TipoInstruccion::Leer);
        assert_eq!(instrucciones[0].argumento, "edad");
        assert!(instrucciones[0].bloque.is_none());
    }

    #[test]
    fn directives_go_to_the_configuration_list() {
        let (instrucciones, configs) =
            parse("#CONFIG COLOR_SI HFF0000\nx = 1\nSI x = 1\n#CONFIG FIGURA_BLOQUE 12,45,1 2.1\nFINSI").unwrap();
        assert_eq!(instrucciones.len(), 2);
        assert_eq!(instrucciones[1].bloque.as_ref().unwrap().len(), 0);
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].indice, "");
        assert_eq!(configs[1].indice, "2.1");
        assert_eq!(configs[1].linea, 4);
    }

    fn nested_si(depth: usize) -> String {
        let mut source = "SI VERDADERO\n".repeat(depth);
        source.push_str("MOSTRAR 1\n");
        source.push_str(&"FINSI\n".repeat(depth));
        source
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let (instrucciones, _) = parse(&nested_si(MAX_NESTING)).unwrap();
        let mut depth = 0;
        let mut bloque = instrucciones.as_slice();
        while let Some(inner) = bloque[0].bloque.as_deref() {
            depth += 1;
            bloque = inner;
        }
        assert_eq!(depth, MAX_NESTING);
        assert_eq!(bloque[0].tipo, TipoInstruccion::Mostrar);
    }

    #[test]
    fn nesting_past_the_limit_is_an_error() {
        let err = parse(&nested_si(MAX_NESTING + 1)).unwrap_err();
        assert_eq!(
            err,
            ParseError::TooDeep {
                line: MAX_NESTING + 1,
                limit: MAX_NESTING
            }
        );

        let source = format!("MIENTRAS FALSO\n{}FINMIENTRAS", nested_si(MAX_NESTING));
        assert_eq!(
            parse(&source).unwrap_err(),
            ParseError::TooDeep {
                line: MAX_NESTING + 1,
                limit: MAX_NESTING
            }
        );
    }

    #[test]
    fn deep_parentheses_are_an_error() {
        let ok = format!("x = {}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse(&ok).is_ok());

        let deep = format!("x = {}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(matches!(parse(&deep), Err(ParseError::TooDeep { line: 1, .. })));

        let negations = format!("MOSTRAR {}VERDADERO", "NO ".repeat(MAX_NESTING + 1));
        assert!(matches!(parse(&negations), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn block_depth_does_not_limit_expressions() {
        let mut source = "SI VERDADERO\n".repeat(MAX_NESTING);
        source.push_str(&format!("x = {}1{}\n", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING)));
        source.push_str(&"FINSI\n".repeat(MAX_NESTING));
        assert!(parse(&source).is_ok());
    }
}
