use super::lexer::TokenKind;
use super::parser::Parser;
use crate::error::ParseError;
use crate::ir::configuracion::is_hex_color;
use crate::ir::{Configuracion, TipoConfiguracion, ValorConfiguracion};
use crate::runtime::{Environment, evaluate};

/// Value as written, before the configuration kind gives it a meaning.
enum RawValue {
    Word(String),
    Numbers(Vec<f64>),
    Text(String),
}

impl Parser<'_> {
    /// `#CONFIG <tipo> <valor> [indice]`
    pub(super) fn parse_directive(&mut self) -> Result<Configuracion, ParseError> {
        let line = self.line();
        self.advance(); // consume '#CONFIG'

        let tipo = match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                TipoConfiguracion::from_name(name)
            }
            _ => return Err(self.unexpected("a configuration kind such as COLOR_SI")),
        };

        let start = self.position;
        let raw = self.parse_raw_value(line)?;
        let text = self.lexemes_since(start);
        let valor = typed_value(&tipo, raw, text)
            .map_err(|message| ParseError::InvalidConfiguration { line, message })?;

        let start = self.position;
        while !matches!(self.peek_kind(), None | Some(TokenKind::Newline | TokenKind::Eof)) {
            self.advance();
        }
        let indice = self.lexemes_since(start);

        Ok(Configuracion {
            tipo,
            valor,
            indice,
            linea: line,
        })
    }

    fn parse_raw_value(&mut self, line: usize) -> Result<RawValue, ParseError> {
        let raw = match self.peek_kind() {
            Some(TokenKind::Identifier(word)) => {
                self.advance();
                RawValue::Word(word.clone())
            }
            Some(TokenKind::Text(text)) => {
                self.advance();
                RawValue::Text(text.clone())
            }
            Some(TokenKind::LParen) => {
                // Constant expression, e.g. a font size written as (10 + 4)
                let expression = self.parse_expression()?;
                let value = evaluate(&expression, &Environment::new()).map_err(|e| {
                    ParseError::InvalidConfiguration {
                        line,
                        message: format!("cannot evaluate {expression}: {e}"),
                    }
                })?;
                let number = value.as_f64().ok_or_else(|| ParseError::InvalidConfiguration {
                    line,
                    message: format!("{expression} is not a number"),
                })?;
                RawValue::Numbers(vec![number])
            }
            Some(TokenKind::Integer(_) | TokenKind::Decimal(_) | TokenKind::Minus) => {
                let mut numbers = vec![self.parse_signed_number()?];
                while matches!(self.peek_kind(), Some(TokenKind::Comma)) {
                    self.advance(); // consume ','
                    numbers.push(self.parse_signed_number()?);
                }
                RawValue::Numbers(numbers)
            }
            _ => {
                return Err(ParseError::InvalidConfiguration {
                    line,
                    message: "missing value".to_string(),
                });
            }
        };
        Ok(raw)
    }

    fn parse_signed_number(&mut self) -> Result<f64, ParseError> {
        let negative = matches!(self.peek_kind(), Some(TokenKind::Minus));
        if negative {
            self.advance();
        }
        let number = match self.peek_kind() {
            Some(TokenKind::Integer(n)) => *n as f64,
            Some(TokenKind::Decimal(d)) => *d,
            _ => return Err(self.unexpected("a number")),
        };
        self.advance();
        Ok(if negative { -number } else { number })
    }

    fn lexemes_since(&self, start: usize) -> String {
        self.tokens[start..self.position]
            .iter()
            .map(|token| token.lexeme.as_str())
            .collect()
    }
}

fn typed_value(tipo: &TipoConfiguracion, raw: RawValue, text: String) -> Result<ValorConfiguracion, String> {
    match (tipo, raw) {
        (TipoConfiguracion::Color(_) | TipoConfiguracion::ColorTexto(_), RawValue::Word(word))
            if is_hex_color(&word) =>
        {
            Ok(ValorConfiguracion::ColorHex(word))
        }
        (TipoConfiguracion::Color(_) | TipoConfiguracion::ColorTexto(_), _) => {
            Err(format!("{tipo} expects a color like HFF0000, found '{text}'"))
        }
        (TipoConfiguracion::Figura(_), RawValue::Numbers(numbers)) if numbers.len() == 3 => {
            Ok(ValorConfiguracion::Triple([numbers[0], numbers[1], numbers[2]]))
        }
        (TipoConfiguracion::Figura(_), _) => {
            Err(format!("{tipo} expects three comma-separated numbers, found '{text}'"))
        }
        (TipoConfiguracion::LetraSize(_), RawValue::Numbers(numbers))
            if numbers.len() == 1 && numbers[0] > 0.0 =>
        {
            Ok(ValorConfiguracion::Tamano(numbers[0]))
        }
        (TipoConfiguracion::LetraSize(_), _) => {
            Err(format!("{tipo} expects one positive number, found '{text}'"))
        }
        (TipoConfiguracion::Letra(_), RawValue::Word(name) | RawValue::Text(name)) => {
            Ok(ValorConfiguracion::Fuente(name))
        }
        (TipoConfiguracion::Letra(_), RawValue::Numbers(_)) => {
            Err(format!("{tipo} expects a font name, found '{text}'"))
        }
        (TipoConfiguracion::Desconocido(_), _) => Ok(ValorConfiguracion::Texto(text)),
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::ir::{Categoria, Configuracion, TipoConfiguracion, ValorConfiguracion};
    use crate::parser::{lexer::tokenize, parser::parse_tokens};

    fn directive(source: &str) -> Result<Configuracion, ParseError> {
        let tokens = tokenize(source).unwrap();
        let (_, mut configs) = parse_tokens(&tokens)?;
        Ok(configs.remove(0))
    }

    #[test]
    fn global_color() {
        let config = directive("#CONFIG COLOR_SI HFF0000").unwrap();
        assert_eq!(config.tipo, TipoConfiguracion::Color(Categoria::Si));
        assert_eq!(config.valor, ValorConfiguracion::ColorHex("HFF0000".into()));
        assert!(config.is_global());
    }

    #[test]
    fn figure_triple_with_index() {
        let config = directive("#CONFIG FIGURA_BLOQUE 12,-45,1.5 3.1.2").unwrap();
        assert_eq!(config.valor, ValorConfiguracion::Triple([12.0, -45.0, 1.5]));
        assert_eq!(config.indice, "3.1.2");
    }

    #[test]
    fn font_size_accepts_constant_expression() {
        let config = directive("#CONFIG LETRA_SIZE_MIENTRAS (10 + 4) 1").unwrap();
        assert_eq!(config.valor, ValorConfiguracion::Tamano(14.0));
        assert_eq!(config.indice, "1");
    }

    #[test]
    fn malformed_values_fail_at_parse_time() {
        assert!(matches!(
            directive("#CONFIG COLOR_SI rojo"),
            Err(ParseError::InvalidConfiguration { line: 1, .. })
        ));
        assert!(matches!(
            directive("#CONFIG FIGURA_SI 1,2"),
            Err(ParseError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            directive("#CONFIG LETRA_SIZE_SI 0"),
            Err(ParseError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            directive("#CONFIG COLOR_SI"),
            Err(ParseError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn unknown_kinds_keep_their_text() {
        let config = directive("#CONFIG SOMBRA_SI 4,4 2").unwrap();
        assert_eq!(
            config.tipo,
            TipoConfiguracion::Desconocido("SOMBRA_SI".into())
        );
        assert_eq!(config.valor, ValorConfiguracion::Texto("4,4".into()));
        assert_eq!(config.indice, "2");
    }
}
